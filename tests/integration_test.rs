use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{FixedOffset, TimeZone, Utc};
use invoke_core::{
    handler_fn, invoke, jsonify, serialize, ControlSignal, Export, Failure, FailureKind, Format,
    HandlerValue, InvocationContext, Invoker, Outcome, Principal, Redirect, Response, Sentinel,
    Settings, Signature,
};
use serde_json::{json, Map};

#[derive(Debug)]
struct Row;

impl Export for Row {
    fn export(&self) -> BTreeMap<String, HandlerValue> {
        BTreeMap::from([("a".to_string(), HandlerValue::Int(1))])
    }
}

fn alice() -> Principal {
    Principal {
        id: "u1".to_string(),
        name: "Alice".to_string(),
    }
}

#[test]
fn missing_identity_is_unauthenticated_and_body_never_runs() {
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    let f = handler_fn(
        "f",
        Signature::new()
            .context("user", Sentinel::Identity)
            .require_identity("please log in"),
        move |_| {
            flag.set(true);
            Ok(HandlerValue::Null)
        },
    );

    let invocation = invoke(&f, InvocationContext::new("req-1"), Format::Json).unwrap();
    let record = invocation.error().expect("invocation should fail");

    assert!(!ran.get());
    assert_eq!(record.kind(), FailureKind::Unauthenticated);
    assert_eq!(record.message(), Some("please log in"));
    assert_eq!(invocation.status(), 401);
}

#[test]
fn present_identity_is_injected() {
    let f = handler_fn(
        "f",
        Signature::new()
            .context("user", Sentinel::Identity)
            .require_identity("please log in"),
        |args| {
            let user = args.identity().expect("identity resolved");
            Ok(user.name.clone().into())
        },
    );

    let ctx = InvocationContext::new("req-2").with_identity(Some(alice()));
    let invocation = invoke(&f, ctx, Format::Json).unwrap();
    assert_eq!(invocation.outcome, Outcome::Value(json!("Alice")));
}

#[test]
fn exported_objects_are_normalized_in_place() {
    let f = handler_fn("items", Signature::new(), |_| {
        Ok(HandlerValue::map([(
            "items",
            HandlerValue::Seq(vec![HandlerValue::export(Row), 3.into(), "x".into()]),
        )]))
    });

    let invocation = invoke(&f, InvocationContext::new("req-3"), Format::Json).unwrap();
    assert_eq!(
        invocation.outcome,
        Outcome::Value(json!({"items": [{"a": 1}, 3, "x"]}))
    );
}

#[test]
fn bad_email_record_is_permissive() {
    let f = handler_fn("signup", Signature::new(), |_| {
        Err(Failure::invalid_input("bad email").into())
    });

    let invocation = invoke(&f, InvocationContext::new("req-4"), Format::Html).unwrap();
    let record = invocation.error().unwrap();

    assert_eq!(record.get("message").to_string(), "bad email");
    let missing = record.get("nonexistent_field");
    assert!(!missing.is_truthy());
    assert_eq!(missing.to_string(), "");
    assert_eq!(missing.into_iter().count(), 0);

    let deeper = missing.get("another");
    assert!(!deeper.is_truthy());
    assert_eq!(deeper.to_string(), "");
    assert_eq!(deeper.into_iter().count(), 0);
}

#[test]
fn timestamps_serialize_as_text() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
    let value = HandlerValue::map([("at", ts)]);

    assert_eq!(jsonify(&value).unwrap(), r#"{"at":"2024-03-01T12:30:00+00:00"}"#);

    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    let local = offset.with_ymd_and_hms(2024, 3, 1, 21, 30, 0).unwrap();
    assert_eq!(
        serialize(&HandlerValue::from(local), Format::Text).unwrap(),
        "2024-03-01T21:30:00+09:00"
    );
}

#[test]
fn control_signal_passes_through_invoke_untouched() {
    let f = handler_fn("cached", Signature::new(), |_| {
        Err(ControlSignal::from_response(
            Some("cache hit"),
            Response::new(200, "text/html", "<p>cached</p>"),
        )
        .into())
    });

    let signal = invoke(&f, InvocationContext::new("req-5"), Format::Json).unwrap_err();
    assert_eq!(signal.message(), Some("cache hit"));

    let response = signal.into_response();
    assert_eq!(response.body, "<p>cached</p>");
    assert_eq!(response.content_type, "text/html");
}

#[test]
fn redirect_signal_keeps_location() {
    let f = handler_fn("old", Signature::new(), |_| {
        Err(ControlSignal::new(None, &Redirect::permanent("/new"), Format::Html).into())
    });

    let response = invoke(&f, InvocationContext::new("req-6"), Format::Json)
        .unwrap_err()
        .into_response();
    assert_eq!(response.status, 301);
    assert_eq!(response.header("location"), Some("/new"));
}

#[test]
fn panics_become_unhandled_failures() {
    let f = handler_fn("broken", Signature::new(), |_| -> invoke_core::HandlerResult {
        panic!("index out of range")
    });

    let quiet = invoke(&f, InvocationContext::new("req-7"), Format::Json).unwrap();
    let record = quiet.error().unwrap();
    assert_eq!(record.kind(), FailureKind::UnhandledFailure);
    assert_eq!(record.message(), Some(invoke_core::GENERIC_MESSAGE));
    assert!(record.trace().is_none());

    let verbose = Invoker::new(Settings {
        show_trace: true,
        ..Settings::default()
    });
    let invocation = verbose
        .invoke(&f, InvocationContext::new("req-8"), Format::Json)
        .unwrap();
    assert!(invocation
        .error()
        .and_then(|r| r.trace())
        .is_some_and(|t| t.contains("index out of range")));
}

#[test]
fn arguments_and_context_bind_together() {
    let f = handler_fn(
        "search",
        Signature::new()
            .arg("q")
            .context("payload", Sentinel::RawPayload)
            .arg_or("limit", 10),
        |args| {
            let q: String = args.get_as("q")?;
            let limit: u32 = args.get_as("limit")?;
            let payload = args.require("payload")?.clone();
            Ok(HandlerValue::map([
                ("q", HandlerValue::from(q)),
                ("limit", HandlerValue::from(limit)),
                ("payload", HandlerValue::from(payload)),
            ]))
        },
    );

    let mut arguments = Map::new();
    arguments.insert("q".into(), json!("rust"));
    let ctx = InvocationContext::new("req-9").with_raw_payload(arguments.clone());

    let invocation = Invoker::default()
        .invoke_with_arguments(&f, ctx, &arguments, Format::Json)
        .unwrap();
    assert_eq!(
        invocation.outcome,
        Outcome::Value(json!({"q": "rust", "limit": 10, "payload": {"q": "rust"}}))
    );
}

#[test]
fn missing_argument_is_invalid_input() {
    let f = handler_fn("search", Signature::new().arg("q"), |args| {
        Ok(args.require("q")?.clone().into())
    });

    let invocation = invoke(&f, InvocationContext::new("req-10"), Format::Json).unwrap();
    let record = invocation.error().unwrap();
    assert_eq!(record.kind(), FailureKind::InvalidInput);
    assert_eq!(record.message(), Some("missing argument 'q'"));
}

#[test]
fn previous_errors_are_injected_for_redisplay() {
    let previous = invoke(
        &handler_fn("signup", Signature::new(), |_| {
            Err(Failure::invalid_input("bad email").into())
        }),
        InvocationContext::new("req-11"),
        Format::Html,
    )
    .unwrap();

    let form = handler_fn(
        "form",
        Signature::new()
            .context("errors", Sentinel::PreviousErrors)
            .context("input", Sentinel::PreviousInput),
        |args| Ok(HandlerValue::map([
            ("errors", HandlerValue::from(args.require("errors")?.clone())),
            ("input", HandlerValue::from(args.require("input")?.clone())),
        ])),
    );

    let ctx = InvocationContext::new("req-12")
        .with_previous_input(Some(json!({"email": "nope"})))
        .with_previous_errors(previous.error().cloned());
    let invocation = invoke(&form, ctx, Format::Html).unwrap();

    assert_eq!(
        invocation.outcome,
        Outcome::Value(json!({
            "errors": {"kind": "InvalidInput", "message": "bad email", "details": {}},
            "input": {"email": "nope"},
        }))
    );
}
