//! 型安全な ID
//!
//! すべての ID は `Id<T>` で包んだ ULID です（`T` はゼロサイズの marker）。
//! marker はコンパイル時にしか存在しないので、どちらも 16 byte であっても
//! `RunId` が必要な場所に `ActionId` を渡すことはできません。
//!
//! # 設計メモ
//! - ULID は生成時刻順にソートされるので、ログやスナップショットが読みやすい
//! - ただしキュー順は ID 順に依存しない（mutation queue が独自の sequence を持つ）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// ID 型ごとの表示用 prefix を与える marker trait
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// derive だと `T` に境界が付くので手書き（marker は値を持たない enum）
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// 表示形式からの parse に失敗したときのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id '{0}'")]
pub struct ParseIdError(pub String);

/// prefix 付き（`act-01H...`）と素の ULID の両方を受け付ける
impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

/// キュー上の action 用 marker
pub enum Action {}

impl IdMarker for Action {
    fn prefix() -> &'static str {
        "act-"
    }
}

/// coordinator の run 用 marker
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// キュー上の action の ID。リモートへ送る冪等キーも兼ねる
pub type ActionId = Id<Action>;

/// drain run 1 回分の ID。ログとイベントの突き合わせに使う
pub type RunId = Id<Run>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        let action = ActionId::from_ulid(Ulid::new());
        let run = RunId::from_ulid(Ulid::new());

        assert!(action.to_string().starts_with("act-"));
        assert!(run.to_string().starts_with("run-"));
    }

    #[test]
    fn id_parses_prefixed_and_bare_forms() {
        let ulid = Ulid::new();
        let id = ActionId::from_ulid(ulid);

        assert_eq!(id.to_string().parse::<ActionId>().unwrap(), id);
        assert_eq!(ulid.to_string().parse::<ActionId>().unwrap(), id);
        assert!("act-not-a-ulid".parse::<ActionId>().is_err());
    }

    #[test]
    fn id_serializes_as_bare_ulid() {
        let ulid = Ulid::new();
        let id = ActionId::from_ulid(ulid);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));

        let back: ActionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn phantom_marker_is_zero_sized() {
        assert_eq!(std::mem::size_of::<ActionId>(), std::mem::size_of::<Ulid>());
        assert_eq!(std::mem::size_of::<RunId>(), 16);
    }
}
