use std::rc::{Rc};
use super::class::{self, Class, Obj};
use super::code::{Func};
use super::cond;
use super::engine::{zjs, Sym};
use super::error::{ZResult};
use super::members::{MemberEntry, Members, Mode};
use super::namespace;
use super::root::{Root};
use super::val::{Val};

/*
the mixin engine is the only code which writes members into a class or object.

each function member is installed as a fresh chain entry (Func::derive), stamped with the
installing class, its name, its static flag and the mixin's tag. when the target scope already
holds a function which was installed by the same class, the new entry is linked into that
function's override chain rather than replacing it:

- if the new entry's priority is at least the head's priority, it becomes the new head, and
  the old head becomes its call_next.
- otherwise, we walk from the head while the next entry's priority is strictly greater than
  the new entry's, and splice the new entry in at that point.

so each chain is ordered by descending priority, and among equal priorities, the most recently
installed entry runs first. the tail of a chain has no call_next; its super method is found in
the base class (see base.rs).

non-function members simply replace whatever was there.
*/

pub(crate) enum Target {
	Class(Class),
	Obj(Root<Obj>)
}

impl Target {
	fn class(&self) -> Class {
		match *self {
			Target::Class(class) => class,
			Target::Obj(ref obj) => obj.class()
		}
	}

	fn is_obj(&self) -> bool {
		matches!(*self, Target::Obj(_))
	}

	//objects keep both their static and instance members in their own fields
	fn get_own(&self, name: Sym, is_static: bool) -> Option<Val> {
		match *self {
			Target::Class(class) => class::with_class(class, |s| {
				if is_static {
					s.statics.get(&name).cloned()
				} else {
					s.proto.get(&name).cloned()
				}
			}),
			Target::Obj(ref obj) => obj.fields.borrow().get(&name).cloned()
		}
	}

	fn get_inherited(&self, name: Sym, is_static: bool) -> Option<Val> {
		match (self.get_own(name, is_static), self.class()) {
			(Some(val), _) => Some(val),
			(None, class) if is_static => class.static_lookup(name),
			(None, class) => class.proto_lookup(name)
		}
	}

	fn set_own(&self, name: Sym, is_static: bool, val: Val) {
		match *self {
			Target::Class(class) => class::with_class_mut(class, |s| {
				if is_static {
					s.statics.insert(name, val);
				} else {
					s.proto.insert(name, val);
				}
			}),
			Target::Obj(ref obj) => {
				obj.fields.borrow_mut().insert(name, val);
			}
		}
	}

	fn member_fullname(&self, name: Sym) -> Option<Rc<str>> {
		match *self {
			Target::Class(class) => class.full_name().map(|fullname| {
				namespace::join_path(&fullname, &name.name())
			}),
			Target::Obj(_) => None
		}
	}
}

pub(crate) fn mixin_val(target: &Val, tag: &str, members: Members) -> ZResult<()> {
	match *target {
		Val::Class(class) => class.mixin(tag, members),
		Val::Obj(ref obj) => obj.mixin(tag, members),
		ref val => bail!(WrongType, "members can't be mixed into {}", val.a_type_name())
	}
}

/**
Installs `members` into `target`.

Plain members are installed first, in order. Each conditional directive is then expanded, and
the members it produces are mixed in under a tag derived from `tag` and the directive's index.
*/
pub(crate) fn apply(target: &Target, tag: Option<Rc<str>>, members: Members) -> ZResult<()> {
	let (plain, directives) = members.into_parts();

	for entry in plain {
		install(target, &tag, entry)?;
	}

	for (i, directive) in directives.iter().enumerate() {
		if let Some(expanded) = cond::expand(directive)? {
			apply(target, Some(cond::derived_tag(&tag, i)), expanded)?;
		}
	}

	Ok(())
}

fn install(target: &Target, tag: &Option<Rc<str>>, entry: MemberEntry) -> ZResult<()> {
	let MemberEntry { name, val, mode, is_static } = entry;
	let sym = zjs::sym(&name)?;
	let class = target.class();
	let existing = target.get_own(sym, is_static);

	match mode {
		Mode::Abstract => {
			match *target {
				Target::Class(class) => {
					if existing.is_none() {
						class::with_class_mut(class, |s| {
							if !s.abstracts.contains(&sym) {
								s.abstracts.push(sym);
							}
						});
					}

					return Ok(())
				}
				Target::Obj(_) => {
					bail!(WrongType, "the abstract member {} can only be declared in a class", name)
				}
			}
		}
		Mode::Replace => {
			ensure!(target.get_inherited(sym, is_static).is_some(), CannotReplace,
			        "{}.{} can't be replaced: it isn't defined", class.display_name(), name);
		}
		Mode::Override => {
			let overridable = matches!(target.get_inherited(sym, is_static), Some(Val::Fn(_)));
			ensure!(overridable && val.is_fn(), CannotOverride,
			        "{}.{} can't be overridden: both the existing and new members must be fns",
			        class.display_name(), name);
		}
		Mode::Plain | Mode::Overwrite => ()
	}

	match val {
		Val::Fn(ref func) => {
			let entry = Func::derive(func);
			let fullname = target.member_fullname(sym);

			entry.with_meta_mut(|meta| {
				meta.name = Some(sym);
				meta.fullname = fullname;
				meta.class = Some(class);
				meta.is_static = Some(is_static);
				meta.on_instance = Some(target.is_obj());
				meta.tag = tag.clone();
				meta.call_next = None;
			});

			match existing {
				Some(Val::Fn(ref head)) if chains(mode) && head.meta().class == Some(class) => {
					splice(target, sym, is_static, head, entry);
				}
				_ => target.set_own(sym, is_static, Val::Fn(entry))
			}
		}
		val => target.set_own(sym, is_static, val)
	}

	if let Target::Class(class) = *target {
		if !is_static {
			class::with_class_mut(class, |s| s.abstracts.retain(|abstract_sym| *abstract_sym != sym));
		}
	}

	log::trace!(target: "zjs::mixin", "installed {} into {}{}", name, class.display_name(),
	            if target.is_obj() { " (instance)" } else { "" });

	Ok(())
}

//overwrite and replace discard the existing chain
fn chains(mode: Mode) -> bool {
	matches!(mode, Mode::Plain | Mode::Override)
}

fn splice(target: &Target, name: Sym, is_static: bool, head: &Root<Func>, entry: Root<Func>) {
	let priority = entry.priority();

	if priority >= head.priority() {
		entry.set_call_next(Some(head.clone()));
		target.set_own(name, is_static, Val::Fn(entry));
		return
	}

	let mut prev = head.clone();
	loop {
		let next = prev.call_next();
		match next {
			Some(ref next_fn) if next_fn.priority() > priority => {
				prev = next_fn.clone();
			}
			_ => {
				entry.set_call_next(next);
				prev.set_call_next(Some(entry));
				return
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::engine::{zjs, Engine};
	use crate::error::{ErrorKind};
	use super::*;

	//a method which appends `label` to the result of its super call
	fn layer(label: &'static str) -> Val {
		zjs::func(move |call| {
			let inner = call.base()?;
			if inner.is_nil() {
				Ok(Val::from(label))
			} else {
				Ok(Val::from(format!("{} {}", inner, label)))
			}
		})
	}

	fn chain_names(class: Class, name: &str) -> ZResult<Vec<String>> {
		let mut names = Vec::new();
		let mut link = match class.get_member(name)? {
			Some(Val::Fn(head)) => Some(head),
			_ => None
		};

		while let Some(func) = link {
			names.push(func.meta().tag.map(|tag| tag.to_string()).unwrap_or_default());
			link = func.call_next();
		}

		Ok(names)
	}

	#[test]
	fn chains_are_ordered_by_priority() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new())?;
			class.mixin("base", Members::new().def("m", layer("base")))?;
			class.mixin("high", Members::new().def("m", zjs::priority(1, layer("high"))?))?;
			class.mixin("low", Members::new().def("m", zjs::priority(-1, layer("low"))?))?;
			class.mixin("zero", Members::new().def("m", layer("zero")))?;

			assert_eq!(chain_names(class, "m")?, vec!["high", "zero", "base", "low"]);

			let obj = class.construct(&[])?;
			assert_eq!(obj.call("m", &[])?.to_string(), "low base zero high");
			Ok(())
		}).unwrap();
	}

	#[test]
	fn static_chains_are_ordered_by_priority() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new().stat("make", layer("base")))?;
			class.mixin("high", Members::new().stat("make", zjs::priority(3, layer("high"))?))?;
			class.mixin("mid", Members::new().stat("make", zjs::priority(1, layer("mid"))?))?;

			let head = class.get_static::<_, Root<Func>>("make")?;
			let tags: Vec<Option<Rc<str>>> = vec![
				head.meta().tag,
				head.call_next().and_then(|next| next.meta().tag)
			];
			assert_eq!(tags, vec![Some(Rc::from("high")), Some(Rc::from("mid"))]);
			assert!(class.get_member("make")?.is_none());

			assert_eq!(class.call("make", &[])?.to_string(), "base mid high");
			Ok(())
		}).unwrap();
	}

	#[test]
	fn overriding_requires_an_existing_fn() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new()
				.def("size", 3)
				.def("m", layer("original")))?;

			let err = class.mixin("bad", Members::new().overriding("size", layer("x"))).unwrap_err();
			assert!(err.is(ErrorKind::CannotOverride));

			let err = class.mixin("bad", Members::new().overriding("missing", layer("x")))
				.unwrap_err();
			assert!(err.is(ErrorKind::CannotOverride));

			let err = class.mixin("bad", Members::new().overriding("m", 5)).unwrap_err();
			assert!(err.is(ErrorKind::CannotOverride));

			class.mixin("good", Members::new().overriding("m", layer("override")))?;
			assert_eq!(chain_names(class, "m")?, vec!["good", ""]);
			assert_eq!(class.construct(&[])?.call("m", &[])?.to_string(), "original override");
			Ok(())
		}).unwrap();
	}

	#[test]
	fn instance_statics_fall_back_to_class_statics() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new().stat("label", layer("class")))?;
			let obj = class.construct(&[])?;
			obj.mixin("special", Members::new().stat("label", layer("instance")))?;

			assert_eq!(obj.call("label", &[])?.to_string(), "class instance");
			assert_eq!(class.call("label", &[])?.to_string(), "class");
			Ok(())
		}).unwrap();
	}

	#[test]
	fn chain_entries_are_not_shared() {
		Engine::new().run(|| {
			let shared = layer("shared");
			let a = zjs::class(Members::new().def("m", shared.clone()))?;
			let b = zjs::class(Members::new().def("m", shared.clone()))?;

			let a_m = a.get_member("m")?.unwrap().unwrap_fn();
			let b_m = b.get_member("m")?.unwrap().unwrap_fn();
			assert!(!Root::ptr_eq(&a_m, &b_m));
			assert_eq!(a_m.meta().class, Some(a));
			assert_eq!(b_m.meta().class, Some(b));
			assert!(zjs::get_meta(&shared, true).is_none());
			Ok(())
		}).unwrap();
	}

	#[test]
	fn overwrite_discards_the_chain() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new().def("m", layer("first")))?;
			class.mixin("second", Members::new().overwrite("m", layer("second")))?;
			assert_eq!(chain_names(class, "m")?, vec!["second"]);

			let err = class.mixin("bad", Members::new().replace("missing", 1)).unwrap_err();
			assert!(err.is(ErrorKind::CannotReplace));
			Ok(())
		}).unwrap();
	}

	#[test]
	fn instance_mixins_fall_back_to_the_class() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new().def("m", layer("class")))?;
			let plain = class.construct(&[])?;
			let special = class.construct(&[])?;

			special.mixin("special", Members::new()
				.def("m", layer("instance"))
				.stat("flag", true))?;

			assert_eq!(plain.call("m", &[])?.to_string(), "class");
			assert_eq!(special.call("m", &[])?.to_string(), "class instance");
			assert_eq!(special.get::<_, bool>("flag")?, true);
			assert!(!plain.has("flag")?);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn directives_are_mixed_in_after_plain_members() {
		Engine::new().run(|| {
			let class = zjs::class(Members::new())?;
			class.mixin("feature", Members::new()
				.when(|| Ok(true), Members::new().def("m", layer("conditional")))
				.def("m", layer("plain")))?;

			assert_eq!(chain_names(class, "m")?, vec!["feature?0", "feature"]);
			Ok(())
		}).unwrap();
	}
}
