use std::rc::{Rc};
use super::error::{ZResult};
use super::members::{Directive, MemberEntry, Members, Source};

/*
conditional member expansion. a directive's predicate (or selector key) is evaluated at the
moment the directive is expanded, which is always after every earlier batch has been fully
registered. the members produced by a directive may themselves contain directives.
*/

fn produce(source: &Source) -> ZResult<Members> {
	match *source {
		Source::Members(ref members) => Ok(members.clone()),
		Source::Lazy(ref f) => f()
	}
}

//evaluates a single directive, returning the members it contributes, if any
pub(crate) fn expand(directive: &Directive) -> ZResult<Option<Members>> {
	match *directive {
		Directive::When(ref pred, ref source) => {
			if pred()? {
				Ok(Some(produce(source)?))
			} else {
				log::trace!(target: "zjs::cond", "discarded a conditional member set");
				Ok(None)
			}
		}
		Directive::Select(ref key, ref cases) => {
			let key = key()?.to_string();

			let chosen = cases.iter().find(|(case, _)| **case == *key)
				.or_else(|| cases.iter().find(|(case, _)| &**case == "*"));

			match chosen {
				Some((_, source)) => Ok(Some(produce(source)?)),
				None => {
					log::trace!(target: "zjs::cond", "no case selected for the key {:?}", key);
					Ok(None)
				}
			}
		}
	}
}

/**
Flattens `members` into a list of plain member entries, in the order they should be
registered in a namespace: everything produced by directives (recursively, in directive order)
comes first, followed by the plain members in their original order.
*/
pub(crate) fn flatten(members: Members) -> ZResult<Vec<MemberEntry>> {
	let (plain, directives) = members.into_parts();

	let mut flattened = Vec::with_capacity(plain.len());
	for directive in &directives {
		if let Some(expanded) = expand(directive)? {
			flattened.extend(flatten(expanded)?);
		}
	}

	flattened.extend(plain);
	Ok(flattened)
}

//the tag under which the members produced by the `index`th directive of a mixin are installed
pub(crate) fn derived_tag(tag: &Option<Rc<str>>, index: usize) -> Rc<str> {
	match *tag {
		Some(ref tag) => Rc::from(format!("{}?{}", tag, index)),
		None => Rc::from(format!("?{}", index))
	}
}

#[cfg(test)]
mod tests {
	use std::cell::{Cell};
	use crate::engine::{zjs, Engine};
	use crate::members::{Selector};
	use crate::val::{Val};
	use super::*;

	fn names(entries: &[MemberEntry]) -> Vec<String> {
		entries.iter().map(|entry| entry.name.to_string()).collect()
	}

	#[test]
	fn directives_expand_before_plain_members() {
		Engine::new().run(|| {
			let members = Members::new()
				.def("plain", 1)
				.when(|| Ok(true), Members::new()
					.def("yes", 2)
					.when(|| Ok(false), Members::new().def("nested_no", 3)))
				.when(|| Ok(false), Members::new().def("no", 4));

			assert_eq!(names(&flatten(members)?), vec!["yes", "plain"]);
			Ok(())
		}).unwrap();
	}

	#[test]
	fn select_falls_back_to_the_wildcard() {
		Engine::new().run(|| {
			let table = || Selector::new()
				.case("linux", Members::new().def("os", "linux"))
				.fallback(Members::new().def("os", "other"));

			let linux = Members::new().select(|| Ok(Val::from("linux")), table());
			let other = Members::new().select(|| Ok(Val::Int(3)), table());
			let none = Members::new().select(|| Ok(Val::Nil), Selector::new()
				.case("x", Members::new().def("x", 1)));

			assert_eq!(flatten(linux)?[0].val, Val::from("linux"));
			assert_eq!(flatten(other)?[0].val, Val::from("other"));
			assert!(flatten(none)?.is_empty());
			Ok(())
		}).unwrap();
	}

	#[test]
	fn lazy_sources_are_only_produced_when_chosen() {
		Engine::new().run(|| {
			thread_local! {
				static PRODUCED: Cell<u32> = Cell::new(0);
			}

			let lazy = || -> ZResult<Members> {
				PRODUCED.with(|count| count.set(count.get() + 1));
				Ok(Members::new().def("lazy", 1))
			};

			let members = Members::new()
				.when_lazy(|| Ok(false), lazy)
				.when_lazy(|| Ok(zjs::has_module("missing")), lazy);

			assert!(flatten(members)?.is_empty());
			assert_eq!(PRODUCED.with(|count| count.get()), 0);

			let members = Members::new().when_lazy(|| Ok(true), lazy);
			assert_eq!(names(&flatten(members)?), vec!["lazy"]);
			assert_eq!(PRODUCED.with(|count| count.get()), 1);
			Ok(())
		}).unwrap();
	}
}
