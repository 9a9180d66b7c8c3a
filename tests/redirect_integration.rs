//! Redirect chains against a live echo fixture

mod common;

use common::{Echo, EchoServer, Fake};
use hopclient::http::{ClientError, ClientOptions, HttpClient, Method, Request, Status};

fn client() -> HttpClient {
    HttpClient::tcp()
}

/// URL answering `status` with a Location pointing at a 200 "followed" answer
fn redirect_to_followed(server: &EchoServer, status: u16) -> String {
    let target = server.fake(&Fake::default().body("followed"));
    server.fake(&Fake::status(status).header("Location", target))
}

#[test]
fn test_follows_redirects() {
    let server = EchoServer::start();
    let cases = [
        (true, server.fake(&Fake::default().body("not-followed")), "not-followed"),
        (true, redirect_to_followed(&server, 200), "not-followed"),
        (true, redirect_to_followed(&server, 302), "followed"),
        (false, redirect_to_followed(&server, 302), "not-followed"),
    ];

    for (follow, url, expected) in cases {
        let options = ClientOptions::builder().follow(follow).build();
        let response = client().get(&url, &options).unwrap();

        assert_eq!(Echo::from_response(&response).body, expected, "follow={} {}", follow, url);
    }
}

#[test]
fn test_follows_with_headers() {
    let server = EchoServer::start();
    let options = ClientOptions::builder()
        .follow_headers(["Authorization", "X-Follow-With-Value"])
        .build();

    let request = Request::builder()
        .uri(redirect_to_followed(&server, 301))
        .header("Authorization", "follow")
        .header("X-Follow-With-Value", "follow")
        .header("X-Not-In-Follow", "no-follow")
        .build()
        .unwrap();

    let response = client().execute(request, &options).unwrap();
    let echo = Echo::from_response(&response);

    assert_eq!(echo.body, "followed");
    assert_eq!(echo.rq_headers.get("authorization").map(String::as_str), Some("follow"));
    assert_eq!(
        echo.rq_headers.get("x-follow-with-value").map(String::as_str),
        Some("follow")
    );
    assert!(!echo.rq_headers.contains_key("x-not-in-follow"));
}

#[test]
fn test_follows_with_strict_method() {
    let server = EchoServer::start();
    let cases = [
        (201, None, Method::Post, "GET"),
        (301, None, Method::Get, "GET"),
        (301, Some(true), Method::Put, "PUT"),
        (302, Some(true), Method::Post, "POST"),
        (302, Some(false), Method::Post, "GET"),
        (302, None, Method::Post, "GET"),
        (303, None, Method::Post, "GET"),
        (307, None, Method::Post, "POST"),
        (308, Some(false), Method::Delete, "DELETE"),
    ];

    for (status, strict, method, expected) in cases {
        let options = ClientOptions::builder()
            .strict_redirect(strict)
            .follow_created(true)
            .build();
        let request = Request::builder()
            .method(method)
            .uri(redirect_to_followed(&server, status))
            .build()
            .unwrap();

        let response = client().execute(request, &options).unwrap();
        let echo = Echo::from_response(&response);

        assert_eq!(echo.body, "followed", "{} {:?} {}", status, strict, method);
        assert_eq!(echo.rq_method, expected, "{} {:?} {}", status, strict, method);
    }
}

#[test]
fn test_follows_with_body_if_not_get() {
    let server = EchoServer::start();
    let cases = [
        (Method::Get, 301, None),
        (Method::Post, 303, None),
        (Method::Post, 307, Some("foo-bar")),
        (Method::Put, 308, Some("foo-bar")),
    ];

    for (method, status, expected) in cases {
        let request = Request::builder()
            .method(method)
            .uri(redirect_to_followed(&server, status))
            .body("foo-bar")
            .build()
            .unwrap();

        let response = client().execute(request, &ClientOptions::default()).unwrap();
        let echo = Echo::from_response(&response);

        assert_eq!(echo.rq_body.as_deref(), expected, "{} {}", method, status);
    }
}

#[test]
fn test_created_not_followed_by_default() {
    let server = EchoServer::start();
    let response = client()
        .get(&redirect_to_followed(&server, 201), &ClientOptions::default())
        .unwrap();

    assert_eq!(response.status(), Status::CREATED);
    assert_eq!(Echo::from_response(&response).body, "ok");
}

#[test]
fn test_relative_location() {
    let server = EchoServer::start();
    let target = Fake::default().body("relative");
    let start = server.fake(&Fake::status(302).header("Location", target.path()));

    let response = client().get(&start, &ClientOptions::default()).unwrap();

    assert_eq!(Echo::from_response(&response).body, "relative");
    assert_eq!(
        response.url().map(|u| u.as_str().to_string()),
        Some(server.fake(&target))
    );
    assert_eq!(
        response.redirects().iter().map(|u| u.to_string()).collect::<Vec<_>>(),
        vec![start]
    );
}

#[test]
fn test_chain_across_servers() {
    let first = EchoServer::start();
    let second = EchoServer::start();

    let end = second.fake(&Fake::default().body("second"));
    let middle = first.fake(&Fake::status(307).header("Location", end));
    let start = second.fake(&Fake::status(303).header("Location", middle));

    let request = Request::builder()
        .method(Method::Post)
        .uri(start)
        .body("payload")
        .build()
        .unwrap();
    let response = client().execute(request, &ClientOptions::default()).unwrap();
    let echo = Echo::from_response(&response);

    assert_eq!(echo.body, "second");
    assert_eq!(echo.rq_method, "GET");
    assert_eq!(echo.rq_body, None);
    assert_eq!(response.redirects().len(), 2);
}

#[test]
fn test_missing_location_returns_redirect() {
    let server = EchoServer::start();
    let response = client()
        .get(&server.fake(&Fake::status(302)), &ClientOptions::default())
        .unwrap();

    assert_eq!(response.status(), Status::FOUND);
    assert!(response.redirects().is_empty());
}

#[test]
fn test_too_many_redirects() {
    let server = EchoServer::start();

    // Each hop's Location is the previous URL, built inside out
    let mut url = server.fake(&Fake::default().body("end"));
    for _ in 0..3 {
        url = server.fake(&Fake::status(302).header("Location", url));
    }

    let options = ClientOptions::builder().max_redirects(2).build();
    match client().get(&url, &options) {
        Err(ClientError::TooManyRedirects { max_redirects, .. }) => assert_eq!(max_redirects, 2),
        other => panic!("expected TooManyRedirects, got {:?}", other),
    }

    let options = ClientOptions::builder().max_redirects(3).build();
    let response = client().get(&url, &options).unwrap();
    assert_eq!(Echo::from_response(&response).body, "end");
    assert_eq!(response.redirects().len(), 3);
}

#[test]
fn test_chunked_redirect_target() {
    let server = EchoServer::start();
    let target = server.fake(&Fake::default().body("chunked").chunked());
    let start = server.fake(&Fake::status(308).header("Location", target));

    let response = client().get(&start, &ClientOptions::default()).unwrap();

    assert_eq!(response.headers().get("transfer-encoding"), Some("chunked"));
    assert_eq!(Echo::from_response(&response).body, "chunked");
}

#[test]
fn test_send_uses_client_options() {
    let server = EchoServer::start();
    let client = HttpClient::tcp().with_options(ClientOptions::builder().follow(false).build());

    let response = client
        .send(Request::get(&redirect_to_followed(&server, 302)).unwrap())
        .unwrap();
    assert_eq!(response.status(), Status::FOUND);
}
