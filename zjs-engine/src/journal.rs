use fnv::{FnvHashMap};
use super::class::{Class, ClassStorage, Obj};
use super::code::{Func};
use super::engine::{with_engine, EngineStorage};
use super::meta::{Meta};
use super::root::{Root};

/*
resolving a namespace batch has side effects outside of the namespace itself: classes are
named and finished, and their member functions are renamed or relinked. if the batch fails,
Namespace::add undoes those effects using a journal.

the engine holds a stack of journals, one per batch which is currently being added. while the
stack is non-empty, the first mutation of each class's storage snapshots that storage, and
every write to a function's or object's metadata records the previous record. a batch which
succeeds merges its journal into the enclosing batch's journal (if any), so that a failure
further out still undoes it.
*/

#[derive(Default)]
pub(crate) struct Journal {
	classes: FnvHashMap<Class, ClassStorage>,
	funcs: Vec<(Root<Func>, Option<Meta>)>,
	objs: Vec<(Root<Obj>, Option<Meta>)>
}

pub(crate) fn begin() {
	with_engine(|engine| engine.journals.borrow_mut().push(Journal::default()))
}

pub(crate) fn commit() {
	with_engine(|engine| {
		let mut journals = engine.journals.borrow_mut();
		let journal = match journals.pop() {
			Some(journal) => journal,
			None => return
		};

		if let Some(outer) = journals.last_mut() {
			//the outer journal's snapshots are older, so they take precedence
			for (class, storage) in journal.classes {
				outer.classes.entry(class).or_insert(storage);
			}

			outer.funcs.extend(journal.funcs);
			outer.objs.extend(journal.objs);
		}
	})
}

pub(crate) fn undo() {
	let journal = match with_engine(|engine| engine.journals.borrow_mut().pop()) {
		Some(journal) => journal,
		None => return
	};

	log::trace!(target: "zjs::ns", "undoing changes to {} classes and {} fns",
	            journal.classes.len(), journal.funcs.len());

	//newest first, so that each record ends up with its oldest saved state
	for (func, meta) in journal.funcs.into_iter().rev() {
		*func.meta.borrow_mut() = meta;
	}

	for (obj, meta) in journal.objs.into_iter().rev() {
		*obj.meta.borrow_mut() = meta;
	}

	let saved_classes = journal.classes;
	let replaced: Vec<ClassStorage> = with_engine(|engine| {
		let mut classes = engine.classes.borrow_mut();
		saved_classes.into_iter().map(|(class, storage)| {
			std::mem::replace(&mut classes[class.0 as usize], storage)
		}).collect()
	});

	drop(replaced);
}

pub(crate) fn record_class(engine: &EngineStorage, class: Class, storage: &ClassStorage) {
	if let Some(journal) = engine.journals.borrow_mut().last_mut() {
		journal.classes.entry(class).or_insert_with(|| storage.clone());
	}
}

pub(crate) fn record_func(func: &Root<Func>) {
	with_engine(|engine| {
		if let Some(journal) = engine.journals.borrow_mut().last_mut() {
			journal.funcs.push((func.clone(), func.meta.borrow().clone()));
		}
	})
}

pub(crate) fn record_obj(obj: &Root<Obj>) {
	with_engine(|engine| {
		if let Some(journal) = engine.journals.borrow_mut().last_mut() {
			journal.objs.push((obj.clone(), obj.meta.borrow().clone()));
		}
	})
}
