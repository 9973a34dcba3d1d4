use std::cell::{RefCell};
use std::rc::{Rc};
use zjs::prelude::*;

fn runtime() -> Runtime {
	let _ = env_logger::builder().is_test(true).try_init();
	Runtime::new()
}

fn run<F: FnOnce() -> ZResult<()>>(f: F) {
	let runtime = runtime();
	if let Err(error) = runtime.try_run(f) {
		panic!("{}", error)
	}
}

//a method which calls its super method, then appends `label` to the result
fn layer(label: &'static str) -> Val {
	zjs::func(move |call| {
		let inner = call.base()?;
		if inner.is_nil() {
			Ok(Val::from(label))
		} else {
			Ok(Val::from(format!("{} > {}", inner, label)))
		}
	})
}

#[test]
fn namespace_paths_are_memoized() {
	run(|| {
		let first = zjs::namespace("app.model")?;
		let second = zjs::namespace("app.model")?;
		assert_eq!(first, second);

		let nested = zjs::namespace("app")?.namespace("model")?;
		assert_eq!(nested, first);

		let class = zjs::class(Members::new())?;
		first.add(Members::new().def("User", class))?;
		assert_eq!(zjs::lookup("app.model.User")?, zjs::lookup("app.model.User")?);
		assert_eq!(zjs::lookup("app.model.User")?, Val::Class(class));
		Ok(())
	});
}

#[test]
fn names_conflict_unless_marked() {
	run(|| {
		let ns = zjs::namespace_with("conf", Members::new().def("n", 1))?;

		let err = ns.add(Members::new().def("n", 2)).unwrap_err();
		assert!(err.is(ErrorKind::NamespaceConflict));
		assert!(err.message().contains("conf.n"));
		assert_eq!(zjs::lookup("conf.n")?, Val::Int(1));

		ns.add(Members::new().overwrite("n", 2))?;
		assert_eq!(zjs::lookup("conf.n")?, Val::Int(2));
		Ok(())
	});
}

#[test]
fn override_chains_run_in_descending_priority() {
	run(|| {
		let class = zjs::class(Members::new().def("m", layer("m")))?;
		class.mixin("five", Members::new().def("m", zjs::priority(5, layer("m'"))?))?;
		class.mixin("two", Members::new().def("m", zjs::priority(2, layer("m''"))?))?;

		let obj = class.construct(&[])?;

		//the innermost super call returns first, so the result reads in reverse call order
		assert_eq!(obj.call("m", &[])?.to_string(), "m > m'' > m'");
		Ok(())
	});
}

#[test]
fn super_calls_without_a_target_are_harmless() {
	run(|| {
		let root_method = zjs::class_from(Base::None, Members::new()
			.def("m", zjs::func(|call| {
				let result = zjs::call_super(call, call.this().clone())?;
				Ok(Val::Bool(result.is_nil()))
			})))?;

		assert_eq!(root_method.construct(&[])?.call("m", &[])?, Val::Bool(true));
		Ok(())
	});
}

#[test]
fn enums_round_trip() {
	run(|| {
		let letters = zjs::enumeration(vec!["A", "B=10", "C"], Members::new())?;
		let values = letters.get_static::<_, Root<Arr>>("values")?;
		assert_eq!(values.len(), 3);

		let mut ordinals = Vec::new();
		let mut ids = Vec::new();
		for constant in values.to_vec() {
			let constant = constant.unwrap_obj();
			ordinals.push(constant.get::<_, i32>("ordinal")?);
			ids.push(constant.get::<_, i32>("id")?);
		}

		assert_eq!(ordinals, vec![0, 10, 11]);
		assert_eq!(ids, vec![0, 1, 2]);

		let b = letters.call("parseName", &[Val::from("B")])?;
		assert_eq!(b, values.get::<Val>(1)?);
		Ok(())
	});
}

#[test]
fn singletons_have_one_instance() {
	run(|| {
		let settings = zjs::singleton(Base::Default, Members::new())?;

		for _ in 0 .. 2 {
			let err = settings.construct(&[]).unwrap_err();
			assert!(err.is(ErrorKind::CannotInstantiateSingleton));
		}

		let first = settings.call("getInstance", &[])?;
		let second = settings.call("getInstance", &[])?;
		assert_eq!(first, second);
		Ok(())
	});
}

#[test]
fn abstract_members_propagate_to_subclasses() {
	run(|| {
		let shape = zjs::class(Members::new().abstract_meth("area"))?;
		let blob = zjs::class_from(shape, Members::new().def("name", "blob"))?;
		let square = zjs::class_from(shape, Members::new()
			.def("area", zjs::func(|_| Ok(Val::Int(16)))))?;

		assert!(shape.construct(&[]).unwrap_err().is(ErrorKind::AbstractInstantiation));
		assert!(blob.construct(&[]).unwrap_err().is(ErrorKind::AbstractInstantiation));
		assert_eq!(square.construct(&[])?.call("area", &[])?, Val::Int(16));
		Ok(())
	});
}

#[test]
fn textual_base_declared_in_a_later_batch() {
	run(|| {
		let a = zjs::class(Members::new().def("foo", zjs::func(|_| Ok(Val::from("foo")))))?;
		zjs::namespace_with("test", Members::new().def("A", a))?;

		let b = zjs::class_from("A", Members::new().def("foo", zjs::func(|call| {
			let inner = zjs::super_fn(call).call(call.this(), &[])?;
			Ok(Val::from(format!("{}-2", inner)))
		})))?;
		zjs::namespace_with("test", Members::new().def("B", b))?;

		let class = zjs::lookup("test.B")?.unwrap_class();
		let obj = class.construct(&[])?;
		assert_eq!(obj.call("foo", &[])?.to_string(), "foo-2");
		assert_eq!(class.base(), Some(a));
		Ok(())
	});
}

#[test]
fn conditional_members() {
	run(|| {
		let class = zjs::class(Members::new()
			.when(|| Ok(1 == 2), Members::new().def("never", 1))
			.when(|| Ok(1 == 1), Members::new().def("always", 2)))?;

		assert!(class.get_member("never")?.is_none());
		assert_eq!(class.get_member("always")?, Some(Val::Int(2)));

		zjs::register_module("feature.fast");
		let ns = zjs::namespace_with("cfg", Members::new()
			.when(|| Ok(zjs::has_module("feature.fast")), Members::new().def("mode", "fast"))
			.select(|| Ok(Val::Int(2)), Selector::new()
				.case("1", Members::new().def("level", "one"))
				.case("2", Members::new().def("level", "two"))))?;

		assert_eq!(ns.lookup("mode")?, Val::from("fast"));
		assert_eq!(ns.lookup("level")?, Val::from("two"));
		Ok(())
	});
}

#[test]
fn mixed_in_priorities_surround_the_original() {
	run(|| {
		let order = Rc::new(RefCell::new(Vec::<&'static str>::new()));

		let step = |label: &'static str| {
			let order = order.clone();
			zjs::func(move |call| {
				order.borrow_mut().push(label);
				call.base()
			})
		};

		let class = zjs::class(Members::new().def("bar", step("bar")))?;
		class.mixin("tagA", Members::new().def("bar", zjs::priority(-1, step("fn1"))?))?;
		class.mixin("tagB", Members::new().def("bar", zjs::priority(1, step("fn2"))?))?;

		class.construct(&[])?.call("bar", &[])?;
		assert_eq!(*order.borrow(), vec!["fn2", "bar", "fn1"]);
		Ok(())
	});
}

#[test]
fn reference_cycles_are_detected() {
	run(|| {
		let a = zjs::class_from("B", Members::new())?;
		let b = zjs::class_from("A", Members::new())?;

		let err = zjs::namespace_with("cyclic", Members::new()
			.def("A", a)
			.def("B", b))
			.unwrap_err();

		assert!(err.is(ErrorKind::ReferenceCycle));
		assert!(err.message().contains("cyclic.A -> cyclic.B -> cyclic.A"));
		assert!(!err.context().is_empty());

		//the failed batch left nothing behind
		assert!(zjs::lookup_opt("cyclic.A")?.is_none());
		Ok(())
	});
}

#[test]
fn failed_batches_leave_their_classes_untouched() {
	run(|| {
		let first_base = zjs::class(Members::new()
			.def("origin", "first")
			.def("describe", zjs::func(|_| Ok(Val::from("describe")))))?;
		let derived = zjs::class_from("Base", Members::new())?;
		let broken = zjs::class_from("Nope", Members::new())?;

		let err = zjs::namespace_with("first", Members::new()
			.def("Base", first_base)
			.def("Derived", derived)
			.def("Broken", broken))
			.unwrap_err();

		assert!(err.is(ErrorKind::UnknownName));
		assert!(zjs::lookup_opt("first.Derived")?.is_none());
		assert!(first_base.full_name().is_none());
		assert!(broken.full_name().is_none());
		assert!(derived.full_name().is_none());
		assert!(!derived.is_finished());

		let describe = first_base.get_member("describe")?.map(Val::unwrap_fn);
		assert!(describe.and_then(|func| func.full_name()).is_none());

		let second_base = zjs::class(Members::new().def("origin", "second"))?;
		zjs::namespace_with("second", Members::new()
			.def("Base", second_base)
			.def("Derived", derived))?;

		assert_eq!(derived.full_name().as_deref(), Some("second.Derived"));
		assert_eq!(derived.base(), Some(second_base));
		assert_eq!(derived.construct(&[])?.get::<_, String>("origin")?, "second");
		assert!(first_base.full_name().is_none());
		Ok(())
	});
}

#[test]
fn missing_modules_fail_fast() {
	run(|| {
		let err = zjs::require_module("app.storage").unwrap_err();
		assert!(err.is(ErrorKind::MissingRequiredModule));

		zjs::register_module("app.storage");
		zjs::register_module("app.storage");
		zjs::require_module("app.storage")?;
		assert_eq!(zjs::modules().iter().filter(|m| &***m == "app.storage").count(), 1);
		Ok(())
	});
}

#[test]
fn every_error_reaches_the_panic_hook() {
	let seen = Rc::new(RefCell::new(Vec::<ErrorKind>::new()));
	let hook_seen = seen.clone();

	let runtime = RuntimeBuilder::new()
		.errors_verbose(false)
		.panic_hook(move |error| hook_seen.borrow_mut().push(error.kind()))
		.build();

	let result = runtime.try_run(|| {
		let ns = zjs::namespace_with("hooked", Members::new().def("x", 1))?;
		ns.add(Members::new().def("x", 2))
	});

	let err = result.unwrap_err();
	assert!(err.is(ErrorKind::NamespaceConflict));
	assert!(err.context().is_empty());
	assert_eq!(*seen.borrow(), vec![ErrorKind::NamespaceConflict]);
}
