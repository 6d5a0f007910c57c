//! HTTP/1.0 framing for one request/response exchange per connection.

use std::io::Write;

use http::header::LOCATION;
use http::{Request, Response, StatusCode};
use session::ResponseError;
use url::Url;

const MAX_HEADERS: usize = 64;

/// Serialises `request` for `url`. The connection is closed by the server after
/// responding, which delimits the body.
pub fn encode_request(request: &Request<String>, url: &Url, cookie: Option<&str>) -> Vec<u8> {
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut bytes = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write!(bytes, "{} {} HTTP/1.0\r\n", request.method(), target);
    let _ = write!(bytes, "Host: {}\r\n", host(url));
    let _ = write!(bytes, "Connection: close\r\n");
    if let Some(cookie) = cookie {
        let _ = write!(bytes, "Cookie: {}\r\n", cookie);
    }
    for (name, value) in request.headers() {
        bytes.extend_from_slice(name.as_str().as_bytes());
        bytes.extend_from_slice(b": ");
        bytes.extend_from_slice(value.as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }
    if request.method() == http::Method::POST || !request.body().is_empty() {
        let _ = write!(bytes, "Content-Length: {}\r\n", request.body().len());
    }
    bytes.extend_from_slice(b"\r\n");
    bytes.extend_from_slice(request.body().as_bytes());
    bytes
}

fn host(url: &Url) -> String {
    let name = url.host_str().unwrap_or("localhost");
    match url.port() {
        Some(port) => format!("{}:{}", name, port),
        None => name.to_owned(),
    }
}

/// Parses the status line and headers once they are complete. Returns the
/// head and its length in bytes, or `None` while more input is needed.
pub fn parse_head(raw: &[u8]) -> Result<Option<(Response<()>, usize)>, ResponseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut headers);
    let length = match parsed.parse(raw) {
        Ok(httparse::Status::Complete(length)) => length,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(ResponseError::Head(e.to_string())),
    };

    let mut builder = Response::builder().status(parsed.code.unwrap_or(0));
    for header in parsed.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    let head = builder.body(()).map_err(|e| ResponseError::Head(e.to_string()))?;
    Ok(Some((head, length)))
}

/// Parses a complete response, read until the server closed the connection.
pub fn parse_response(raw: &[u8]) -> Result<Response<Vec<u8>>, ResponseError> {
    let (head, length) = parse_head(raw)?
        .ok_or_else(|| ResponseError::Head("connection closed inside the response head".to_owned()))?;

    let mut body = &raw[length..];
    let declared = head.headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok());
    if let Some(declared) = declared {
        if declared < body.len() {
            body = &body[..declared];
        }
    }

    let (parts, ()) = head.into_parts();
    Ok(Response::from_parts(parts, body.to_vec()))
}

/// Where a redirect response points, resolved against the URL that produced it.
pub fn redirect_target<T>(response: &Response<T>, base: &Url) -> Option<Url> {
    if !response.status().is_redirection() || response.status() == StatusCode::NOT_MODIFIED {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    base.join(location).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Url {
        Url::parse("http://127.0.0.1:5000").unwrap()
    }

    #[test]
    fn post_carries_headers_cookie_and_length() {
        let request = Request::builder()
            .method(http::Method::POST)
            .uri("/move")
            .header("X-CSRFToken", "tok3n")
            .body("cur_x=1".to_owned())
            .unwrap();

        let bytes = encode_request(&request, &server().join("/move").unwrap(), Some("session=abc"));
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("POST /move HTTP/1.0\r\nHost: 127.0.0.1:5000\r\n"));
        assert!(text.contains("\r\nConnection: close\r\n"));
        assert!(text.contains("\r\nCookie: session=abc\r\n"));
        assert!(text.contains("\r\nx-csrftoken: tok3n\r\n"));
        assert!(text.ends_with("\r\nContent-Length: 7\r\n\r\ncur_x=1"));
    }

    #[test]
    fn get_has_no_body() {
        let request = Request::builder().uri("/join_game/game01").body(String::new()).unwrap();

        let bytes = encode_request(&request, &server().join("/join_game/game01").unwrap(), None);

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "GET /join_game/game01 HTTP/1.0\r\nHost: 127.0.0.1:5000\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn body_is_cut_at_content_length() {
        let response =
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello world").unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"hello");
    }

    #[test]
    fn body_runs_to_close_without_length() {
        let response = parse_response(b"HTTP/1.0 400 BAD REQUEST\r\n\r\n<p>no</p>").unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), b"<p>no</p>");
    }

    #[test]
    fn truncated_head_is_an_error() {
        match parse_response(b"HTTP/1.1 200 OK\r\nContent-") {
            Err(ResponseError::Head(_)) => (),
            other => panic!("expected head error, got {:?}", other),
        }
        assert!(parse_head(b"HTTP/1.1 200 OK\r\n").unwrap().is_none());
    }

    #[test]
    fn redirect_is_resolved_against_the_request() {
        let response = parse_response(b"HTTP/1.0 302 FOUND\r\nLocation: /index\r\n\r\n").unwrap();
        let base = server().join("/stop_game/game01").unwrap();

        assert_eq!(
            redirect_target(&response, &base).map(|url| url.to_string()),
            Some("http://127.0.0.1:5000/index".to_owned())
        );
        assert!(redirect_target(&parse_response(b"HTTP/1.0 200 OK\r\n\r\n").unwrap(), &base).is_none());
    }
}
