mod common;

use common::{body_string, mock_env};
use http::Method;
use retort::config::{SessionSettings, Settings};
use retort::dispatcher::{Action, Retort};
use retort::router::RouteTarget;
use retort::session::{FileSessionStore, SSID_COOKIE};
use serde_json::json;

fn session_app(dir: &std::path::Path) -> Retort {
    let settings = Settings {
        sessions: SessionSettings {
            directory: dir.to_path_buf(),
            max_age: 60,
        },
        ..Settings::default()
    };
    let store = FileSessionStore::new(&settings.sessions).unwrap();
    let mut app = Retort::new(settings);
    app.set_session_factory(store);

    app.connect(
        "login",
        "/login",
        RouteTarget::handler(|req, _resp| {
            req.session.insert("user", json!("Bar"));
            Ok(Action::Body("logged in".to_string()))
        }),
        None,
    );
    app.connect(
        "whoami",
        "/whoami",
        RouteTarget::handler(|req, _resp| {
            let user = req
                .session
                .get("user")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();
            Ok(Action::Body(user))
        }),
        None,
    );
    app.connect(
        "logout",
        "/logout",
        RouteTarget::handler(|req, _resp| {
            req.session.invalidate();
            Ok(Action::Body("logged out".to_string()))
        }),
        None,
    );

    app
}

fn env_with_cookie(path: &str, cookie: &str) -> retort::environ::Environ {
    let mut env = mock_env(Method::GET, path);
    env.gateway_vars
        .push(("HTTP_COOKIE".to_string(), cookie.to_string()));
    env
}

fn extract_ssid(tx: &retort::environ::Transmission) -> Option<String> {
    tx.headers.iter().find_map(|(k, v)| {
        if k.eq_ignore_ascii_case("Set-Cookie") && v.starts_with("ssid=") {
            v.trim_start_matches("ssid=")
                .split(';')
                .next()
                .map(str::to_string)
        } else {
            None
        }
    })
}

#[test]
fn test_untouched_session_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_app(dir.path());

    let tx = app.handle(mock_env(Method::GET, "/whoami"));
    assert_eq!(body_string(tx), "anonymous");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_mutation_persists_across_requests() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_app(dir.path());

    let tx = app.handle(mock_env(Method::GET, "/login"));
    let ssid = extract_ssid(&tx).expect("login should mint a session cookie");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let tx = app.handle(env_with_cookie("/whoami", &format!("{SSID_COOKIE}={ssid}")));
    assert!(extract_ssid(&tx).is_none(), "no new cookie for a clean session");
    assert_eq!(body_string(tx), "Bar");
}

#[test]
fn test_invalidate_removes_file_and_expires_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_app(dir.path());

    let tx = app.handle(mock_env(Method::GET, "/login"));
    let ssid = extract_ssid(&tx).unwrap();

    let tx = app.handle(env_with_cookie("/logout", &format!("{SSID_COOKIE}={ssid}")));
    let expired = tx
        .headers
        .iter()
        .find(|(k, v)| k.eq_ignore_ascii_case("Set-Cookie") && v.contains("Max-Age=0"));
    assert!(expired.is_some(), "invalidation should expire the cookie");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let tx = app.handle(env_with_cookie("/whoami", &format!("{SSID_COOKIE}={ssid}")));
    assert_eq!(body_string(tx), "anonymous");
}

#[test]
fn test_cookie_path_segments_cannot_escape_store_dir() {
    let outer = tempfile::tempdir().unwrap();
    let sess_dir = outer.path().join("sess");
    std::fs::create_dir_all(&sess_dir).unwrap();
    let victim = outer.path().join("victim.json");
    std::fs::write(&victim, "{}").unwrap();

    let app = session_app(&sess_dir);

    // A crafted cookie neither reads the outside file into the session
    // nor lets the dirty save overwrite it.
    let tx = app.handle(env_with_cookie(
        "/login",
        &format!("{SSID_COOKIE}=../victim.json"),
    ));
    assert_eq!(body_string(tx), "logged in");
    assert_eq!(std::fs::read_to_string(&victim).unwrap(), "{}");
    assert_eq!(std::fs::read_dir(&sess_dir).unwrap().count(), 1);

    let tx = app.handle(env_with_cookie(
        "/whoami",
        &format!("{SSID_COOKIE}=../victim.json"),
    ));
    assert_eq!(body_string(tx), "anonymous");
}

#[test]
fn test_stale_cookie_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_app(dir.path());

    let tx = app.handle(env_with_cookie(
        "/whoami",
        &format!("{SSID_COOKIE}=01ARZ3NDEKTSV4RRFFQ69G5FAV"),
    ));
    assert_eq!(body_string(tx), "anonymous");
}
