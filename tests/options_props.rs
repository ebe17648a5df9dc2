//! Property tests for option normalization.

use proptest::prelude::*;
use wsbus::{BinaryType, ClientOptions, RawOptions, ReconnectPolicy, SocketOptions};

fn host() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("localhost".to_string()),
        Just("127.0.0.1".to_string()),
        "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5})?",
    ]
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4).prop_map(|segments| segments.join("/"))
}

fn raw_client() -> impl Strategy<Value = RawOptions> {
    (
        host(),
        any::<u16>(),
        any::<bool>(),
        path(),
        any::<bool>(),
        0u64..100_000,
        prop::collection::vec("[a-z]{1,6}", 0..3),
        any::<bool>(),
    )
        .prop_map(
            |(host, port, ssl, path, array_buffer, interval, protocols, after_open)| {
                RawOptions::new()
                    .host(host)
                    .port(port)
                    .ssl(ssl)
                    .path(path)
                    .binary_type(if array_buffer {
                        BinaryType::ArrayBuffer
                    } else {
                        BinaryType::Blob
                    })
                    .reconnect_interval(interval)
                    .protocol(protocols)
                    .reconnect_policy(if after_open {
                        ReconnectPolicy::AfterOpen
                    } else {
                        ReconnectPolicy::Always
                    })
            },
        )
}

proptest! {
    #[test]
    fn prop_to_raw_renormalizes_equal(raw in raw_client()) {
        let options = ClientOptions::normalize(&raw).expect("generated options are valid");
        let again = ClientOptions::normalize(&options.to_raw().expect("raw")).expect("valid");
        prop_assert_eq!(options, again);
    }

    #[test]
    fn prop_url_agrees_with_parts(raw in raw_client()) {
        let options = ClientOptions::normalize(&raw).expect("valid");
        let from_url =
            ClientOptions::normalize(&RawOptions::new().url(options.url())).expect("valid url");

        prop_assert_eq!(from_url.host(), options.host());
        prop_assert_eq!(from_url.port(), options.port());
        prop_assert_eq!(from_url.path(), options.path());
        prop_assert_eq!(from_url.ssl(), options.ssl());
        prop_assert!(options.path().starts_with('/'));
    }

    #[test]
    fn prop_socket_options_lift_to_client(port in any::<u16>(), path in path()) {
        let socket = SocketOptions::normalize(&RawOptions::new().port(port).path(path.clone()))
            .expect("valid");
        prop_assert_eq!(socket.path(), path.as_str());

        let client = socket.into_client_options().expect("client");
        prop_assert_eq!(client.port(), port);
        prop_assert!(client.path().starts_with('/'));
    }
}

