//! Wire-level tests against the in-process server.
//!
//! The server side recomputes each SigV2 signature from what actually arrived
//! on the socket, the same way an S3 service would.

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use futures::stream;
    use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE};
    use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
    use s3v2_auth::canonical::{canonicalize_amz_headers, escape_query_value};
    use s3v2_auth::sigv2::build_query_string_to_sign;
    use s3v2_auth::{Credentials, HeaderStringToSign, authorization_header, compute_signature};
    use s3v2_client::{ClientError, ListOptions};

    use crate::{CapturedRequest, WIRE_ACCESS_KEY, WIRE_SECRET_KEY, WireServer};

    fn credentials() -> Credentials {
        Credentials::new(WIRE_ACCESS_KEY, WIRE_SECRET_KEY).unwrap()
    }

    fn header<'a>(req: &'a CapturedRequest, name: &str) -> &'a str {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Authorization header a SigV2 server would expect for `req`.
    fn expected_authorization(req: &CapturedRequest) -> String {
        let pairs: Vec<(&str, &str)> = req
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        let canonical_headers = canonicalize_amz_headers(pairs);
        let resource = req.signed_resource();
        let date = if req.headers.contains_key("x-amz-date") {
            ""
        } else {
            header(req, DATE.as_str())
        };

        let string_to_sign = HeaderStringToSign {
            verb: req.method.as_str(),
            content_md5: header(req, "content-md5"),
            content_type: header(req, CONTENT_TYPE.as_str()),
            date,
            canonical_headers: &canonical_headers,
            resource: &resource,
        }
        .build();

        authorization_header(&credentials(), &string_to_sign)
    }

    fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    #[tokio::test]
    async fn test_should_deliver_put_with_verifiable_signature() {
        let server = WireServer::start().await;
        let client = server.client(&["photos"]);
        let bucket = client.bucket("photos").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append(
            HeaderName::from_static("x-amz-meta-tag"),
            HeaderValue::from_static("a"),
        );
        headers.append(
            HeaderName::from_static("x-amz-meta-tag"),
            HeaderValue::from_static("b"),
        );

        let response = bucket
            .put_bytes(&b"{\"name\":\"x\"}\n"[..], "/test/user.json", &headers)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), &Bytes::from_static(b"ok"));

        let captured = server.captured();
        assert_eq!(captured.len(), 1);
        let req = &captured[0];
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.path, "/test/user.json");
        assert_eq!(req.signed_resource(), "/photos/test/user.json");
        assert_eq!(header(req, "x-amz-acl"), "public-read");
        assert_eq!(header(req, CONTENT_LENGTH.as_str()), "13");
        assert_eq!(req.body.len(), 13);
        assert_eq!(header(req, AUTHORIZATION.as_str()), expected_authorization(req));
    }

    #[tokio::test]
    async fn test_should_verify_request_dated_by_amz_date() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-amz-date"),
            HeaderValue::from_static("Tue, 14 Nov 2023 22:13:20 GMT"),
        );

        bucket.get_file("/dated.txt", &headers).await.unwrap();

        let req = &server.captured()[0];
        assert!(req.headers.contains_key(DATE));
        assert_eq!(header(req, AUTHORIZATION.as_str()), expected_authorization(req));
    }

    #[tokio::test]
    async fn test_should_refuse_dot_segment_keys_before_sending() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();

        for key in ["dir/../secret.txt", "dir/./a.txt", "dir/%2e%2e/secret.txt"] {
            let err = bucket.get_file(key, &HeaderMap::new()).await.unwrap_err();
            assert!(matches!(err, ClientError::InvalidKey(_)), "{key}");
            assert!(matches!(
                bucket.signed_url(key, Utc::now() + Duration::hours(1)),
                Err(ClientError::InvalidKey(_))
            ));
        }
        assert!(server.captured().is_empty());
    }

    #[tokio::test]
    async fn test_should_stream_body_with_declared_length() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();
        let chunks = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"chunk-one,")),
            Ok(Bytes::from_static(b"chunk-two")),
        ]);

        bucket
            .put_stream(chunks, 19, "/streams/data.bin", &HeaderMap::new())
            .await
            .unwrap();

        let req = &server.captured()[0];
        assert_eq!(req.body, Bytes::from_static(b"chunk-one,chunk-two"));
        assert_eq!(header(req, CONTENT_TYPE.as_str()), "application/octet-stream");
        assert_eq!(header(req, AUTHORIZATION.as_str()), expected_authorization(req));
    }

    #[tokio::test]
    async fn test_should_fail_stream_upload_with_source_error() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "source truncated")),
        ]);

        let err = bucket
            .put_stream(chunks, 64, "/streams/broken.bin", &HeaderMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Source(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_should_keep_list_query_outside_signature() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();
        let options = ListOptions::builder()
            .prefix("2024/")
            .delimiter("/")
            .max_keys(50)
            .build();

        bucket.list("/", &options, &HeaderMap::new()).await.unwrap();

        let req = &server.captured()[0];
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, "/");
        assert_eq!(req.query.as_deref(), Some("prefix=2024%2F&max-keys=50&delimiter=%2F"));
        assert_eq!(req.signed_resource(), "/photos/");
        assert_eq!(header(req, AUTHORIZATION.as_str()), expected_authorization(req));
    }

    #[tokio::test]
    async fn test_should_pass_not_found_through() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();

        let response = bucket.get_file("/missing.txt", &HeaderMap::new()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = bucket.head_file("/missing.txt", &HeaderMap::new()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_should_sign_service_level_listing() {
        let server = WireServer::start().await;
        let client = server.client(&[]);

        client.list_buckets(&HeaderMap::new()).await.unwrap();

        let req = &server.captured()[0];
        assert_eq!(req.host(), server.endpoint());
        assert_eq!(req.signed_resource(), "/");
        assert_eq!(header(req, AUTHORIZATION.as_str()), expected_authorization(req));
    }

    #[tokio::test]
    async fn test_should_serve_presigned_url_without_credentials_headers() {
        let server = WireServer::start().await;
        let bucket = server.client(&["photos"]).bucket("photos").unwrap();
        let url = bucket
            .signed_url("/test/obj.json", Utc::now() + Duration::hours(1))
            .unwrap();

        let response = server
            .http_client(&["photos"])
            .get(&url)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let req = &server.captured()[0];
        assert!(req.headers.get(AUTHORIZATION).is_none());
        let query = req.query.as_deref().unwrap();
        let expires: i64 = query_param(query, "Expires").unwrap().parse().unwrap();
        assert_eq!(query_param(query, "AWSAccessKeyId"), Some(WIRE_ACCESS_KEY));

        let string_to_sign = build_query_string_to_sign("GET", expires, &req.signed_resource());
        let expected = escape_query_value(&compute_signature(&credentials(), &string_to_sign));
        assert_eq!(query_param(query, "Signature"), Some(expected.as_str()));
    }
}
