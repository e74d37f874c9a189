use std::borrow::Cow;
use std::fmt::Display;

use rouille::{Response, ResponseBody};

use crate::warn;

pub const INTERNAL_SERVER_ERROR: u16 = 500;

fn response(status: u16, content_type: &'static str, body: String) -> Response {
    Response {
        status_code: status,
        headers: vec![(Cow::from("Content-type"), Cow::from(content_type))],
        data: ResponseBody::from_string(body),
        upgrade: None,
    }
}

pub fn htmlresponse(status: u16, body: String) -> Response {
    response(status, "text/html", body)
}

pub fn jsonresponse(status: u16, body: String) -> Response {
    response(status, "application/json", body)
}

/// 500 with the error's description as a plain text body. `what`
/// says what failed, for the log line.
pub fn errorresponse(what: &str, err: &dyn Display) -> Response {
    warn!("{what} failed (return {INTERNAL_SERVER_ERROR}): {err}");
    response(INTERNAL_SERVER_ERROR, "text/plain; charset=utf-8", err.to_string())
}

/// The value of header `name` (case-insensitive), for inspecting
/// responses.
pub fn response_header<'r>(response: &'r Response, name: &str) -> Option<&'r str> {
    response.headers.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_ref())
}


#[cfg(test)]
pub mod tests {
    use std::io::Read;

    use super::*;

    pub fn body_string(response: Response) -> String {
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut s = String::new();
        reader.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn t_responses() {
        let r = htmlresponse(201, "<p>hi</p>".into());
        assert_eq!(r.status_code, 201);
        assert_eq!(response_header(&r, "content-type"), Some("text/html"));
        assert_eq!(body_string(r), "<p>hi</p>");

        let r = errorresponse("test", &"it broke");
        assert_eq!(r.status_code, 500);
        assert_eq!(response_header(&r, "Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(body_string(r), "it broke");

        let r = jsonresponse(200, "{}".into());
        assert_eq!(response_header(&r, "Content-type"), Some("application/json"));
    }
}
