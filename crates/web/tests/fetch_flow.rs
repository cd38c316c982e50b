//! End-to-end fetcher behaviour against a scripted server.

use platform::mocks::{http_response, MockClock, MockConnector, MockDelay, RecordedRequest};
use web::{Document, FetchError, Fetcher, Progress, TagStripExtractor, Url};

type TestFetcher = Fetcher<MockConnector, MockDelay, MockClock>;

fn fetcher(server: &MockConnector) -> TestFetcher {
    let clock = MockClock::new();
    Fetcher::new(server.clone(), MockDelay::new(clock.clone()), clock)
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn login_page(token: &str) -> String {
    format!(
        "<html><body><h1>Sign in</h1>\
         <form action=\"/session\" method=\"post\">\
         <input type=\"hidden\" name=\"authenticity_token\" value=\"{token}\">\
         <input name=\"login\"><input type=\"password\" name=\"password\">\
         <input type=\"submit\" name=\"commit\" value=\"Sign in\"></form></body></html>"
    )
}

fn has_cookie(req: &RecordedRequest, pair: &str) -> bool {
    req.header("Cookie").is_some_and(|c| c.split("; ").any(|p| p == pair))
}

fn csrf_site(req: &RecordedRequest) -> Vec<u8> {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", p) if p.starts_with("/login") => {
            let token = if has_cookie(req, "_session=abc") { "tok2" } else { "tok1" };
            http_response(200, &[], &login_page(token))
        }
        ("POST", "/session") if req.body_str().contains("authenticity_token=tok2") => http_response(
            302,
            &[("Location", "/dashboard"), ("Set-Cookie", "logged_in=yes; Path=/")],
            "",
        ),
        ("POST", "/session") => http_response(
            302,
            &[
                ("Location", "/login?auth_error=1"),
                ("Set-Cookie", "_session=abc; Path=/; HttpOnly"),
            ],
            "",
        ),
        ("GET", "/dashboard") if has_cookie(req, "logged_in=yes") => {
            http_response(200, &[], "<p>Welcome ann</p>")
        }
        _ => http_response(404, &[], "nope"),
    }
}

#[tokio::test]
async fn test_login_retries_with_fresh_token() {
    let server = MockConnector::new(csrf_site);
    let mut client = fetcher(&server);
    let mut doc = Document::default();
    let mut page = vec![0u8; 4096];
    let mut ex = TagStripExtractor;

    let login = client
        .load(&url("https://site.org/login"), &mut ex, &mut doc, &mut page, &mut |_: Progress| {})
        .await
        .unwrap();
    let mut form = doc.forms[0].clone();
    assert_eq!(form.get("authenticity_token"), Some("tok1"));
    assert!(form.set("login", "ann"));
    assert!(form.set("password", "secret"));

    let landed = client
        .submit(&form, &login.url, &mut ex, &mut doc, &mut page, &mut |_: Progress| {})
        .await
        .unwrap();
    assert_eq!(landed.status, 200);
    assert_eq!(landed.url.as_str(), "https://site.org/dashboard");
    assert_eq!(doc.text(&page), b"Welcome ann");

    let reqs = server.requests();
    let trail: Vec<(&str, &str)> = reqs.iter().map(|r| (r.method.as_str(), r.path.as_str())).collect();
    assert_eq!(
        trail,
        [
            ("GET", "/login"),
            ("POST", "/session"),
            ("GET", "/login?auth_error=1"),
            ("GET", "/login"),
            ("POST", "/session"),
            ("GET", "/dashboard"),
        ]
    );
    assert_eq!(
        reqs[4].body_str(),
        "authenticity_token=tok2&login=ann&password=secret&commit=Sign+in"
    );
    assert!(has_cookie(&reqs[4], "_session=abc"));
    assert_eq!(reqs[4].header("Referer"), Some("https://site.org/login"));
    assert_eq!(reqs[4].header("Origin"), Some("https://site.org"));
    assert_eq!(reqs[4].header("Sec-Fetch-Site"), Some("same-origin"));
    assert_eq!(
        reqs[4].header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
    // Same host throughout: one TLS connection.
    assert_eq!(server.connects(), [("site.org".to_string(), 443, true)]);
}

#[tokio::test]
async fn test_mandatory_headers() {
    let server = MockConnector::new(|_| http_response(200, &[], "ok"));
    let mut client = fetcher(&server);
    let mut page = [0u8; 64];
    client.get(&url("http://plain.net:8080/a"), &mut page, &mut |_: Progress| {}).await.unwrap();
    let req = &server.requests()[0];
    assert_eq!(req.header("Host"), Some("plain.net:8080"));
    assert!(req.header("User-Agent").is_some_and(|ua| ua.starts_with("Mozilla/5.0")));
    assert!(req.header("Accept").is_some());
    assert!(req.header("Accept-Language").is_some());
    assert_eq!(req.header("Upgrade-Insecure-Requests"), Some("1"));
    assert_eq!(req.header("Cache-Control"), Some("max-age=0"));
    assert_eq!(req.header("Cookie"), None);
    assert_eq!(server.connects(), [("plain.net".to_string(), 8080, false)]);
}

#[tokio::test]
async fn test_redirect_limit() {
    let server = MockConnector::new(|_| http_response(302, &[("Location", "/again")], ""));
    let mut client = fetcher(&server);
    let mut page = [0u8; 64];
    let err = client.get(&url("https://loop.org/"), &mut page, &mut |_: Progress| {}).await;
    assert_eq!(err, Err(FetchError::TooManyRedirects));
    // The original request plus five followed redirects.
    assert_eq!(server.requests().len(), 6);
}

#[tokio::test]
async fn test_post_becomes_get_on_303() {
    let server = MockConnector::new(|req| match req.path.as_str() {
        "/form" => http_response(303, &[("Location", "/done")], ""),
        _ => http_response(200, &[], "thanks"),
    });
    let mut client = fetcher(&server);
    let mut page = [0u8; 64];
    let origin = url("https://a.org/start");
    let done = client
        .post(&url("https://a.org/form"), b"x=1", &origin, &mut page, &mut |_: Progress| {})
        .await
        .unwrap();
    assert_eq!(done.url.as_str(), "https://a.org/done");
    assert_eq!(&page[..done.len], b"thanks");
    let reqs = server.requests();
    assert_eq!(reqs[1].method, "GET");
    assert!(reqs[1].body.is_empty());
    assert_eq!(reqs[1].header("Content-Length"), None);
}

#[tokio::test]
async fn test_cross_host_redirect_scopes_cookies() {
    let server = MockConnector::new(|req| match req.host.as_str() {
        "a.org" => http_response(
            301,
            &[("Location", "https://b.org/landing"), ("Set-Cookie", "sid=1")],
            "",
        ),
        _ => http_response(200, &[], "b"),
    });
    let mut client = fetcher(&server);
    let mut page = [0u8; 64];
    client.get(&url("a.org"), &mut page, &mut |_: Progress| {}).await.unwrap();
    client.get(&url("https://a.org/again"), &mut page, &mut |_: Progress| {}).await.unwrap();
    let reqs = server.requests();
    assert_eq!(reqs[1].host, "b.org");
    assert_eq!(reqs[1].header("Cookie"), None);
    assert_eq!(reqs[2].header("Cookie"), Some("sid=1"));
    assert_eq!(client.jar().get("a.org", "sid"), Some("1"));
    let hosts: Vec<String> = server.connects().into_iter().map(|(h, _, _)| h).collect();
    assert_eq!(hosts, ["a.org", "b.org", "a.org", "b.org"]);
}

#[tokio::test]
async fn test_chunked_body_in_small_reads() {
    let server = MockConnector::new(|_| {
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          7\r\n<p>Chun\r\n8\r\nked!</p>\r\n0\r\n\r\n"
            .to_vec()
    });
    server.set_read_chunk(3);
    let mut client = fetcher(&server);
    let mut doc = Document::default();
    let mut page = [0u8; 128];
    client
        .load(&url("https://c.org/"), &mut TagStripExtractor, &mut doc, &mut page, &mut |_: Progress| {})
        .await
        .unwrap();
    assert_eq!(doc.text(&page), b"Chunked!");
}

#[tokio::test]
async fn test_keep_alive_reused_and_close_honoured() {
    let server = MockConnector::new(|req| match req.path.as_str() {
        "/bye" => http_response(200, &[("Connection", "close")], "bye"),
        _ => http_response(200, &[], "hi"),
    });
    let mut client = fetcher(&server);
    let mut page = [0u8; 64];
    for path in ["/one", "/two", "/bye", "/three"] {
        let target = url(&format!("https://k.org{path}"));
        client.get(&target, &mut page, &mut |_: Progress| {}).await.unwrap();
    }
    assert_eq!(server.connects().len(), 2);
}

#[tokio::test]
async fn test_failures_map_to_errors() {
    let server = MockConnector::new(|req| match req.path.as_str() {
        "/missing" => http_response(404, &[], "not here"),
        "/big" => http_response(200, &[], &"z".repeat(100)),
        _ => b"HTTP/1.1 200 OK\r\nContent-Length: 50\r\n\r\npartial".to_vec(),
    });
    server.refuse("down.org");
    let mut client = fetcher(&server);
    assert_eq!(status_of(&mut client, "https://down.org/").await, Err(FetchError::ConnectionRefused));
    assert_eq!(status_of(&mut client, "https://s.org/missing").await, Err(FetchError::Status(404)));
    assert_eq!(status_of(&mut client, "https://s.org/big").await, Err(FetchError::OutOfMemory));

    server.stall_after_response(true);
    assert_eq!(status_of(&mut client, "https://s.org/slow").await, Err(FetchError::Timeout));
}

async fn status_of(client: &mut TestFetcher, target: &str) -> Result<u16, FetchError> {
    let mut page = [0u8; 64];
    client.get(&url(target), &mut page, &mut |_: Progress| {}).await.map(|p| p.status)
}
