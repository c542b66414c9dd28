//! Action trait - Rust の型とキューに保存される `kind` 文字列を結びつける

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{ActionKind, NewAction};

/// 型付きのリモート mutation
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendMoney {
///     to: String,
///     cents: u64,
/// }
///
/// impl Action for SendMoney {
///     const KIND: &'static str = "payments.send_money.v1";
/// }
/// ```
///
/// # 注意
/// - `KIND` はキュー上の各 action と一緒に永続化される
/// - 変更すると旧名で積まれた action が宙に浮く
/// - 変えるときは version suffix を上げ、キューが空になるまで旧 handler も登録しておく
pub trait Action: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn kind() -> ActionKind {
        ActionKind::new(Self::KIND)
    }
}

impl NewAction {
    /// Encode a typed action into the untyped enqueue input.
    pub fn from_action<A: Action>(action: &A) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: A::kind(),
            payload: serde_json::to_value(action)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde::{Deserialize, Serialize};

    use super::Action;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SendMoney {
        pub to: String,
        pub cents: u64,
    }

    impl Action for SendMoney {
        const KIND: &'static str = "payments.send_money.v1";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UpdateProfile {
        pub display_name: String,
    }

    impl Action for UpdateProfile {
        const KIND: &'static str = "profile.update.v1";
    }
}
