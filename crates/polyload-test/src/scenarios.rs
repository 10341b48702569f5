//! End-to-end scenarios
//!
//! Artifacts resolve to domains built from the fixture loader; callers built
//! on those domains exercise dispatch, proxies and results together.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use polyload_artifact::{pending_cleanup, run_exit_cleanup, Artifact, EmbeddedArchive};
use polyload_core::{BoxError, FailureKind, MethodDef, Value, Versioned};
use polyload_dispatch::{args, Arg, Caller, Capability, InstanceBuilder};
use polyload_domain::{ambient_domain, DomainRegistry};
use serial_test::serial;
use tracing::Level;

use crate::capture::LogCapture;
use crate::fixtures::{
    fixture_loader, greeter_file, shared_library, GREETER_CLASS, LISTENER_INTERFACE, SHARED_CLASS,
};
use crate::counting::CountingEnumerator;
use crate::scratch::ScratchDir;

fn registry() -> Arc<DomainRegistry> {
    Arc::new(DomainRegistry::new(Arc::new(fixture_loader())))
}

/// Artifact enumerating the linked greeter at `version`
fn linked(name: &str, version: &str) -> Arc<Artifact> {
    Artifact::custom(CountingEnumerator::new([format!("libs/{}", greeter_file(version))]))
        .name(name)
        .build()
}

fn greeter_builder(registry: &Arc<DomainRegistry>, artifact: &Arc<Artifact>) -> InstanceBuilder {
    InstanceBuilder::new(Arc::clone(registry))
        .package("greet")
        .class_name("Greeter")
        .artifact(Arc::clone(artifact))
}

fn greeter(registry: &Arc<DomainRegistry>, artifact: &Arc<Artifact>) -> Caller {
    greeter_builder(registry, artifact).build().unwrap()
}

#[test]
fn test_directory_artifact_answers_its_version() {
    let scratch = ScratchDir::new("e2e-dir").unwrap();
    scratch.binary("libs/greeter", &greeter_file("1.0")).unwrap();
    scratch.file("libs/greeter/notes.txt", b"ignored").unwrap();

    let artifact = Artifact::dir()
        .root("libs")
        .name("greeter")
        .base_dir(scratch.path())
        .build();
    let registry = registry();

    let caller = greeter(&registry, &artifact);
    assert_eq!(caller.call("version").unwrap().as_string(), "1.0");

    let domain = registry.get(&artifact);
    assert_eq!(domain.locations().len(), 1);
    assert_eq!(domain.libraries().len(), 1);
}

#[test]
fn test_two_versions_coexist() {
    let registry = registry();
    let v1 = linked("greeter-v1", "1.0");
    let v2 = linked("greeter-v2", "2.0");

    let old = greeter(&registry, &v1);
    let new = greeter(&registry, &v2);

    assert_eq!(old.call("version").unwrap().as_string(), "1.0");
    assert_eq!(new.call("version").unwrap().as_string(), "2.0");
    assert_eq!(old.call("greet").unwrap().as_string(), "hello world from 1.0");
    assert_eq!(old.provenance().version(), "1.0");
    assert_eq!(new.provenance().version(), "2.0");

    let old_type = old.type_def().unwrap();
    let new_type = new.type_def().unwrap();
    assert_eq!(old_type.name(), new_type.name());
    assert!(!Arc::ptr_eq(old_type, new_type));

    assert!(old.is_instance_of(GREETER_CLASS));
    assert!(new.is_instance_of(GREETER_CLASS));
    let foreign = registry.get(&v2).find_type(GREETER_CLASS).unwrap();
    assert!(!Arc::ptr_eq(old_type, &foreign));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_fallback_chain_logs_each_step() {
    let registry = registry();
    let last_enumerator = CountingEnumerator::new([format!("libs/{}", greeter_file("2.0"))]);
    let last = Artifact::custom(last_enumerator.clone()).name("c").build();
    let middle = Artifact::custom(CountingEnumerator::empty())
        .name("b")
        .fallback(last)
        .build();
    let first = Artifact::custom(CountingEnumerator::empty())
        .name("a")
        .fallback(middle)
        .build();

    let capture = LogCapture::new();
    let domain = {
        let _guard = capture.install();
        registry.get(&first)
    };

    assert_eq!(capture.count(Level::INFO, "falling back"), 2);
    assert_eq!(capture.count(Level::WARN, "did not find any binaries"), 0);
    assert_eq!(domain.fallback_trail(), ["b", "c"]);
    assert_eq!(domain.name(), "a");
    assert_eq!(domain.libraries().len(), 1);
    assert_eq!(last_enumerator.calls(), 1);

    let caller = greeter(&registry, &first);
    assert_eq!(caller.call("version").unwrap().as_string(), "2.0");
}

#[test]
fn test_empty_domain_fails_at_use() {
    let registry = registry();
    let artifact = Artifact::custom(CountingEnumerator::empty()).name("nothing").build();

    let capture = LogCapture::new();
    let domain = {
        let _guard = capture.install();
        registry.get(&artifact)
    };
    assert!(domain.is_empty());
    assert_eq!(capture.count(Level::WARN, "did not find any binaries"), 1);

    let err = greeter_builder(&registry, &artifact).build().unwrap_err();
    assert!(err.is_resolution());
    assert!(matches!(err.kind(), FailureKind::TypeNotFound { .. }));
}

#[test]
fn test_concurrent_first_use_builds_once() {
    let registry = registry();
    let enumerator = CountingEnumerator::with_delay(
        [format!("libs/{}", greeter_file("1.0"))],
        Duration::from_millis(20),
    );
    let artifact = Artifact::custom(enumerator.clone()).name("contended").build();

    let domains: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| registry.get(&artifact)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(enumerator.calls(), 1);
    assert!(domains.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

    registry.reset_all();
    let rebuilt = registry.get(&artifact);
    assert!(!Arc::ptr_eq(&rebuilt, &domains[0]));
    assert_eq!(enumerator.calls(), 2);
}

#[test]
fn test_proxy_passed_into_library_code() {
    let registry = registry();
    let artifact = linked("greeter-v1", "1.0");
    let caller = greeter(&registry, &artifact);

    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);
    let listener = InstanceBuilder::new(Arc::clone(&registry))
        .package("greet")
        .interface_name("Listener")
        .artifact(Arc::clone(&artifact))
        .handler(move |op: &MethodDef, args: &[Value]| -> Result<Value, BoxError> {
            sink.lock().push(format!("{}:{}", op.name(), args[0]));
            Ok(Value::from("ack"))
        })
        .build()
        .unwrap();

    assert!(listener.is_instance_of(LISTENER_INTERFACE));

    let answer = caller.call_with("notify", vec![Arg::from(&listener)]).unwrap();
    assert_eq!(answer.as_string(), "ack");
    assert_eq!(*heard.lock(), vec!["on_greeting:hello from 1.0".to_string()]);
}

#[test]
fn test_repeat_resolution_hits_the_cache() {
    let registry = registry();
    let caller = greeter(&registry, &linked("greeter-v1", "1.0"));
    let ty = Arc::clone(caller.type_def().unwrap());

    let before = ty.lookup_count();
    assert_eq!(caller.call_with("add", args![1i64, 2i64]).unwrap().as_long(), 3);
    assert_eq!(ty.lookup_count() - before, 2);

    let before = ty.lookup_count();
    assert_eq!(caller.call_with("add", args![5i64, 6i64]).unwrap().as_long(), 11);
    assert_eq!(ty.lookup_count(), before);
    assert_eq!(caller.cached_capabilities(), 1);
}

#[test]
fn test_rerun_dispatches_against_same_caller() {
    let registry = registry();
    let caller = greeter(&registry, &linked("greeter-v1", "1.0"));

    let first = caller.call_with("add", args![1i64, 2i64]).unwrap();
    let second = first.rerun(args![3i64, 4i64]).unwrap();

    assert_eq!(first.as_long(), 3);
    assert_eq!(second.as_long(), 7);
    assert_eq!(second.caller().unwrap().see(), caller.see());
    assert_eq!(
        second.origin().map(Capability::full_name),
        first.origin().map(Capability::full_name)
    );
    assert_eq!(second.origin().unwrap().args(), [Value::from(3i64), Value::from(4i64)]);
}

#[test]
fn test_factory_and_results_carry_provenance() {
    let registry = registry();
    let artifact = linked("greeter-v2", "2.0");
    let caller = greeter_builder(&registry, &artifact)
        .factory_method("create")
        .param("ada")
        .build()
        .unwrap();

    let greeting = caller.call("greet").unwrap();
    assert_eq!(greeting.as_string(), "hello ADA from 2.0");
    assert_eq!(greeting.provenance().label(), "greeter");
    assert_eq!(greeting.provenance().version(), "2.0");
    assert!(Arc::ptr_eq(&greeting.artifact(), &artifact));
    assert_eq!(caller.call("to_string").unwrap().as_string(), "Greeter(ADA@2.0)");
}

#[test]
fn test_enum_constants_through_builder() {
    let registry = registry();
    let tones = InstanceBuilder::new(Arc::clone(&registry))
        .package("greet")
        .class_name("Tone")
        .artifact(linked("greeter-v1", "1.0"))
        .build_enum()
        .unwrap();

    assert_eq!(tones.names(), ["Warm", "Formal", "Curt"]);
    let formal = tones.get("FORMAL").unwrap();
    assert_eq!(formal.call("ordinal").unwrap().as_long(), 1);
    assert_eq!(formal.call("name").unwrap().as_string(), "Formal");
    assert!(formal.is_instance_of("tone"));
}

#[test]
fn test_system_domain_is_parent_first() {
    let registry = Arc::new(DomainRegistry::with_system_libraries(
        Arc::new(fixture_loader()),
        vec![shared_library()],
    ));
    let shared = Artifact::custom(CountingEnumerator::new([format!("libs/{}", greeter_file("1.0"))]))
        .name("with-system")
        .uses_system_domain(true)
        .build();
    let isolated = linked("isolated", "1.0");

    let clock = InstanceBuilder::new(Arc::clone(&registry))
        .package("shared")
        .class_name("Clock")
        .artifact(Arc::clone(&shared))
        .static_object(true)
        .build()
        .unwrap();
    assert_eq!(clock.call("now").unwrap().as_long(), 1_700_000_000);

    let system_type = registry.system_domain().find_type(SHARED_CLASS).unwrap();
    let seen = registry.get(&shared).find_type(SHARED_CLASS).unwrap();
    assert!(Arc::ptr_eq(&system_type, &seen));

    let err = registry.get(&isolated).load_type(SHARED_CLASS).unwrap_err();
    assert!(matches!(err.kind(), FailureKind::TypeNotFound { .. }));
}

#[test]
fn test_force_included_type_is_located() {
    let registry = registry();
    let artifact = Artifact::custom(CountingEnumerator::empty())
        .name("forced")
        .force_include(GREETER_CLASS)
        .build();

    let domain = registry.get(&artifact);
    assert_eq!(domain.libraries().len(), 1);
    assert_eq!(greeter(&registry, &artifact).call("version").unwrap().as_string(), "1.0");
}

#[test]
fn test_push_domain_around_call() {
    let registry = registry();
    let artifact = linked("greeter-v1", "1.0");
    let caller = greeter(&registry, &artifact);

    let pushed = Capability::builder("ambient")
        .static_call(true)
        .push_domain(true)
        .build()
        .unwrap();
    assert_eq!(caller.call_descriptor(&pushed).unwrap().as_string(), "greeter-v1");
    assert!(ambient_domain().is_none());

    let plain = Capability::static_method("ambient", args![]).unwrap();
    assert!(caller.call_descriptor(&plain).unwrap().is_null());
}

#[test]
#[serial]
fn test_archive_artifact_extracts_and_cleans_up() {
    let scratch = ScratchDir::new("e2e-archive").unwrap();
    let destination = scratch.path().join("extracted");
    let archive = EmbeddedArchive::new(
        "bundle.zip",
        vec![
            ("libs/greeter/", b"".as_slice()),
            ("libs/greeter/greeter-2.0.plugin", b"\0polyload".as_slice()),
            ("README.txt", b"docs".as_slice()),
        ],
    );
    let artifact = Artifact::archive(Arc::new(archive))
        .root("libs")
        .name("greeter")
        .destination(&destination)
        .temp(true)
        .build();

    let registry = registry();
    let caller = greeter(&registry, &artifact);
    assert_eq!(caller.call("version").unwrap().as_string(), "2.0");
    assert!(destination.join(greeter_file("2.0")).is_file());
    assert!(!destination.join("README.txt").exists());
    assert!(pending_cleanup().contains(&destination));

    assert!(run_exit_cleanup() >= 2);
    assert!(!destination.exists());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_coerced_calls_share_one_cache_entry(pairs in prop::collection::vec((any::<i32>(), any::<i32>()), 1..16)) {
            let registry = registry();
            let caller = greeter(&registry, &linked("greeter-v1", "1.0"));
            for (a, b) in pairs {
                let sum = caller.call_with("add", args![i64::from(a), i64::from(b)]).unwrap();
                prop_assert_eq!(sum.as_long(), i64::from(a) + i64::from(b));
            }
            prop_assert_eq!(caller.cached_capabilities(), 1);
        }
    }
}
