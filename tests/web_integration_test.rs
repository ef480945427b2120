//! End-to-end tests from transport request to response.

use invoke_core::web::{Dispatcher, ExtractContext, RequestAdapter};
use invoke_core::{
    handler_fn, ControlSignal, Failure, Format, HandlerValue, InvocationContext, Principal,
    Redirect, Response, Sentinel, Settings, Signature,
};
use serde_json::{json, Value};

fn alice() -> Principal {
    Principal {
        id: "user-1".to_string(),
        name: "Alice".to_string(),
    }
}

fn body_json(response: &Response) -> Value {
    serde_json::from_str(&response.body).expect("response body is JSON")
}

#[test]
fn adapter_to_dispatcher_json_flow() {
    let profile = handler_fn(
        "profile",
        Signature::new()
            .context("user", Sentinel::Identity)
            .context("country", Sentinel::GeoCountry)
            .arg("tab")
            .require_identity("please log in"),
        |args| {
            let user = args.identity().expect("required identity is bound");
            Ok(HandlerValue::map([
                ("name", HandlerValue::from(user.name.as_str())),
                ("country", HandlerValue::from(args.require("country")?.clone())),
                ("tab", HandlerValue::from(args.get_as::<String>("tab")?)),
            ]))
        },
    );

    let mut request = RequestAdapter::new("req-web-1");
    request.set_principal(Some(alice()));
    request.set_geo_country(Some("DE".to_string()));
    request.add_query_param("tab", "settings");
    request.add_header("Accept", "application/json");

    let response = Dispatcher::default().dispatch(&profile, &request);
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "application/json");
    assert_eq!(
        body_json(&response),
        json!({"name": "Alice", "country": "DE", "tab": "settings"})
    );
}

#[test]
fn unauthenticated_request_gets_json_error_body() {
    let secret = handler_fn(
        "secret",
        Signature::new()
            .context("user", Sentinel::Identity)
            .require_identity("please log in"),
        |_| Ok("classified".into()),
    );

    let mut request = RequestAdapter::new("req-web-2");
    request.set_extension("json");

    let response = Dispatcher::default().dispatch(&secret, &request);
    assert_eq!(response.status, 401);
    assert_eq!(
        body_json(&response),
        json!({"code": 401, "exception": "Unauthenticated", "message": "please log in"})
    );
}

#[test]
fn handler_control_signal_is_emitted_verbatim() {
    let payload = Response::new(418, "application/x-teapot", "{not: json}")
        .with_header("X-Brew", "earl grey");
    let expected = payload.clone();

    let teapot = handler_fn("teapot", Signature::new(), move |_| {
        Err(ControlSignal::from_response(Some("short and stout"), payload.clone()).into())
    });

    let mut request = RequestAdapter::new("req-web-3");
    request.set_extension("html");

    let response = Dispatcher::default().dispatch(&teapot, &request);
    assert_eq!(response, expected);
}

#[test]
fn middleware_redirect_short_circuits() {
    let dashboard = handler_fn("dashboard", Signature::new(), |_| {
        panic!("dashboard must not run for anonymous users")
    });
    let dispatcher = Dispatcher::default().with_middleware(|ctx: &InvocationContext| {
        match ctx.identity() {
            Some(_) => Ok(()),
            None => Err(ControlSignal::new(
                Some("login required"),
                &Redirect::to("/login?next=/dashboard"),
                Format::Html,
            )),
        }
    });

    let request = RequestAdapter::new("req-web-4");
    let response = dispatcher.dispatch(&dashboard, &request);
    assert_eq!(response.status, 302);
    assert_eq!(response.header("location"), Some("/login?next=/dashboard"));
}

#[test]
fn unsupported_format_reports_no_view_method() {
    let chart = handler_fn("chart", Signature::new(), |_| Ok(vec![1i64, 2, 3].into()));
    let mut request = RequestAdapter::new("req-web-5");
    request.set_extension("gif");

    let response = Dispatcher::default().dispatch(&chart, &request);
    assert_eq!(response.status, 415);
    assert_eq!(response.content_type, "text/plain");
}

#[test]
fn opaque_values_fall_back_to_text() {
    #[derive(Debug)]
    struct Socket;
    impl invoke_core::Reflect for Socket {}

    let leak = handler_fn("leak", Signature::new(), |_| Ok(HandlerValue::object(Socket)));
    let mut request = RequestAdapter::new("req-web-6");
    request.set_extension("json");

    let response = Dispatcher::default().dispatch(&leak, &request);
    assert_eq!(response.status, 200);
    assert_eq!(body_json(&response), json!("Socket"));
}

#[test]
fn html_lists_are_escaped() {
    let tags = handler_fn("tags", Signature::new(), |_| {
        Ok(vec!["<b>rust</b>", "serde"].into())
    });
    let mut request = RequestAdapter::new("req-web-7");
    request.set_extension("html");

    let response = Dispatcher::default().dispatch(&tags, &request);
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        "<ul>\n<li>&lt;b&gt;rust&lt;/b&gt;</li>\n<li>serde</li>\n</ul>"
    );
}

#[test]
fn cli_request_flows_through() {
    let migrate = handler_fn(
        "migrate",
        Signature::new().arg("table").arg_or("force", false),
        |args| {
            let table: String = args.get_as("table")?;
            let force: bool = args.get_as("force")?;
            Ok(format!("migrating {} (force={})", table, force).into())
        },
    );

    let request = RequestAdapter::from_cli("cli-1", ["--table=users", "--force"]);
    let response = Dispatcher::new(Settings {
        default_format: Format::Text,
        ..Settings::default()
    })
    .dispatch(&migrate, &request);

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "migrating users (force=true)");
}

#[test]
fn validation_failures_redisplay_with_previous_input() {
    let signup = handler_fn("signup", Signature::new().arg("email"), |args| {
        let email: String = args.get_as("email")?;
        if email.contains('@') {
            Ok("welcome".into())
        } else {
            Err(Failure::invalid_input("bad email").into())
        }
    });

    let mut first = RequestAdapter::new("req-web-8");
    first.set_body_field("email", "nope");
    first.set_extension("json");
    let invocation = invoke_core::invoke(&signup, first.extract_context(), Format::Json);
    // Arguments only bind through the dispatcher or `invoke_with_arguments`.
    assert_eq!(
        invocation.unwrap().error().unwrap().message(),
        Some("missing argument 'email'")
    );

    let rejected = invoke_core::Invoker::default()
        .invoke_with_arguments(
            &signup,
            first.extract_context(),
            &first.extract_arguments(),
            Format::Json,
        )
        .unwrap();
    let errors = rejected.error().cloned();
    assert_eq!(errors.as_ref().and_then(|e| e.message()), Some("bad email"));

    let form = handler_fn(
        "form",
        Signature::new()
            .context("errors", Sentinel::PreviousErrors)
            .context("input", Sentinel::PreviousInput),
        |args| {
            Ok(HandlerValue::map([
                ("message", HandlerValue::from(args.require("errors")?["message"].clone())),
                ("email", HandlerValue::from(args.require("input")?["email"].clone())),
            ]))
        },
    );

    let mut second = RequestAdapter::new("req-web-9");
    second.set_previous(Some(json!({"email": "nope"})), errors);
    second.set_extension("json");
    let response = Dispatcher::default().dispatch(&form, &second);
    assert_eq!(
        body_json(&response),
        json!({"message": "bad email", "email": "nope"})
    );
}
