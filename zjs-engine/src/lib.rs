#![forbid(unsafe_code)]

#![doc(html_root_url = "https://docs.rs/zjs/0.2")]

//! This crate is an implementation detail of the [`zjs` crate](https://docs.rs/zjs/).

#[macro_use]
mod error;

mod base;
mod class;
mod code;
mod collections;
mod cond;
mod engine;
mod journal;
mod members;
mod meta;
mod mixin;
mod namespace;
mod root;
mod val;
mod wrap;

pub use self::{
	class::{Base, Class, Obj},
	code::{Call, Func},
	collections::{Arr},
	engine::{Engine, EngineBuilder, PanicHook, Sym, ToSym},
	error::{ErrorKind, raise, ZError, ZResult},
	members::{Members, Selector},
	meta::{Meta},
	namespace::{Namespace},
	root::{Root},
	val::{Val},
	wrap::{FromVal, ToVal}
};

#[doc(hidden)]
pub use self::engine::{Guard};

pub use self::engine::zjs::*;
