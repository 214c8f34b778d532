mod common;

use common::core;
use proptest::prelude::*;
use sip_core::SipUri;
use sip_testkit::build_response;

proptest! {
    /// In-dialog requests number consecutively whatever the method mix.
    #[test]
    fn cseq_increments_by_one(messages in prop::collection::vec(any::<bool>(), 1..20)) {
        let (mut ua, _) = core(5060, "p");
        let invite = ua
            .create_invite("alice", SipUri::parse("sip:bob@127.0.0.1:5070").unwrap())
            .unwrap();
        let call_id = invite.call_id().to_owned();
        ua.send_request(invite.clone()).unwrap();
        ua.on_response_received(build_response(&invite, 200, Some("t")), &mut ())
            .unwrap();

        let mut previous = invite.cseq().seq();
        for is_message in messages {
            let request = if is_message {
                ua.create_message(&call_id, "ping").unwrap()
            } else {
                ua.create_bye(&call_id).unwrap()
            };
            prop_assert_eq!(request.cseq().seq(), previous + 1);
            previous = request.cseq().seq();
        }
    }
}
