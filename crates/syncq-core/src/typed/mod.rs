//! Typed action API - 型安全な action 配送
//!
//! kind 文字列を Rust の型に結びつけ、typo で別の handler に
//! 配送されることを防ぎます。
//!
//! - **表層**: [`Action`], [`Handler<A>`]
//! - **内部**: [`DynHandler`]（型消去して [`ActionRegistry`] に格納）

pub mod action;
pub mod handler;
pub mod registry;

pub use self::action::Action;
pub use self::handler::{ActionContext, DynHandler, Handler, TypedHandler};
pub use self::registry::{ActionRegistry, RegistryError};
