use bytes::Bytes;
use proptest::prelude::*;
use sip_core::{
    CSeq, MessageHeaders, Method, NameAddr, PartyHeader, Request, SipMessage, SipUri, StatusLine,
    Response, ViaHeader,
};
use sip_parse::{Codec, SipCodec};

fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::Invite),
        Just(Method::Ack),
        Just(Method::Bye),
        Just(Method::Message),
        "[A-Z]{3,9}".prop_map(|t| Method::from_token(&t)),
    ]
}

fn party_strategy() -> impl Strategy<Value = PartyHeader> {
    (
        proptest::option::of("[A-Za-z ]{1,10}"),
        "[a-z]{1,8}",
        "[a-z0-9.]{1,12}",
        proptest::option::of(1u16..65535),
        proptest::option::of("[A-Za-z0-9\\-]{1,20}"),
    )
        .prop_map(|(display, user, host, port, tag)| {
            let mut uri = SipUri::new(host.as_str()).with_user(user.as_str());
            uri.port = port;
            let mut addr = NameAddr::new(uri);
            addr.display_name = display.map(Into::into);
            PartyHeader::new(addr, tag.map(Into::into))
        })
}

fn via_strategy() -> impl Strategy<Value = ViaHeader> {
    (
        prop::sample::select(vec!["UDP", "TCP"]),
        "[a-z0-9.]{1,12}",
        proptest::option::of(1u16..65535),
        "[A-Za-z0-9]{1,16}",
        prop::bool::ANY,
    )
        .prop_map(|(transport, host, port, suffix, rport)| {
            let branch = format!("z9hG4bK{}", suffix);
            let mut via = ViaHeader::new(transport, host.as_str(), port, branch);
            if rport {
                via.params.insert("rport".into(), None);
            }
            via
        })
}

fn headers_strategy() -> impl Strategy<Value = (MessageHeaders, Method)> {
    (
        prop::collection::vec(via_strategy(), 1..4),
        party_strategy(),
        party_strategy(),
        "[A-Za-z0-9@.\\-]{1,32}",
        1u32..=u32::MAX,
        method_strategy(),
        0u8..=255,
        prop::bool::ANY,
    )
        .prop_map(|(via, from, to, call_id, seq, method, max_forwards, with_contact)| {
            let cseq = CSeq::new(seq, method.clone()).expect("non-zero");
            let mut headers = MessageHeaders::new(via, from.clone(), to, call_id, cseq);
            headers.max_forwards = max_forwards;
            if with_contact {
                headers.contact = Some(from.addr);
            }
            (headers, method)
        })
}

fn body_strategy() -> impl Strategy<Value = Option<(String, Vec<u8>)>> {
    proptest::option::of((
        prop::sample::select(vec!["application/sdp", "application/text"]).prop_map(String::from),
        prop::collection::vec(any::<u8>(), 0..256),
    ))
}

proptest! {
    #[test]
    fn request_roundtrip((headers, method) in headers_strategy(), body in body_strategy()) {
        let uri = headers.to.addr.uri.clone();
        let mut req = Request::new(method, uri, headers).expect("has via");
        if let Some((content_type, bytes)) = body {
            req.set_body(content_type, Bytes::from(bytes));
        }
        let msg = SipMessage::Request(req);
        let codec = SipCodec::new();
        prop_assert_eq!(codec.decode(&codec.encode(&msg)), Ok(msg));
    }

    #[test]
    fn response_roundtrip(
        (headers, _) in headers_strategy(),
        code in 100u16..=699,
        body in body_strategy(),
    ) {
        let status = StatusLine::with_default_reason(code).expect("in range");
        let mut resp = Response::new(status, headers).expect("valid call-id");
        if let Some((content_type, bytes)) = body {
            resp.set_body(content_type, Bytes::from(bytes));
        }
        let msg = SipMessage::Response(resp);
        let codec = SipCodec::new();
        prop_assert_eq!(codec.decode(&codec.encode(&msg)), Ok(msg));
    }
}
