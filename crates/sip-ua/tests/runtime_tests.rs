mod common;

use std::time::Duration;

use common::{core, Core, Recorder};
use sip_core::Method;
use sip_testkit::{build_ack, build_in_dialog, build_invite, encode};
use sip_transport::{InboundPacket, TransportKind};
use sip_ua::{UaError, UserAgent, UserAgentHandle};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn packet(payload: bytes::Bytes) -> InboundPacket {
    InboundPacket {
        transport: TransportKind::Udp,
        peer: "127.0.0.1:5060".parse().unwrap(),
        payload,
    }
}

async fn wait_for_events(
    handle: &UserAgentHandle<Vec<String>, Recorder>,
    count: usize,
) -> Vec<String> {
    timeout(Duration::from_secs(2), async {
        loop {
            let events = handle.run(|_, h| h.events.clone()).await.unwrap();
            if events.len() >= count {
                return events;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("events within timeout")
}

#[tokio::test]
async fn worker_answers_a_call() {
    let (bob, transport): (Core, _) = core(5070, "b");
    let (handle, inbox) = UserAgentHandle::channel(8);
    let agent = UserAgent::new(bob, Recorder::answering(), inbox);
    let (packets, rx) = mpsc::channel(8);
    let worker = tokio::spawn(agent.run(rx));

    assert_eq!(wait_for_events(&handle, 1).await, vec!["listening"]);

    let invite = build_invite("sip:bob@127.0.0.1:5070", "z9hG4bKb1", "rt-1");
    packets.send(packet(encode(invite.clone()))).await.unwrap();
    wait_for_events(&handle, 2).await;

    let tag = transport.sent()[1].response().to().tag().unwrap().to_owned();
    packets
        .send(packet(encode(build_ack(&invite, &tag, "z9hG4bKack"))))
        .await
        .unwrap();
    packets
        .send(packet(encode(build_in_dialog(
            &invite,
            Method::Bye,
            2,
            &tag,
            "z9hG4bKbye",
        ))))
        .await
        .unwrap();

    let events = wait_for_events(&handle, 5).await;
    assert_eq!(
        events,
        vec![
            "listening",
            "invite rt-1",
            "server-confirmed",
            "bye",
            "terminated"
        ]
    );
    assert_eq!(handle.run(|core, _| core.dialog_count()).await.unwrap(), 0);

    let codes: Vec<u16> = transport.sent().iter().map(|s| s.response().code()).collect();
    assert_eq!(codes, vec![100, 200, 200]);

    drop(packets);
    worker.await.unwrap().unwrap();
    assert!(matches!(
        handle.run(|core, _| core.dialog_count()).await,
        Err(UaError::WorkerStopped)
    ));
}

#[tokio::test]
async fn bad_packets_do_not_stop_the_worker() {
    let (bob, _transport): (Core, _) = core(5070, "b");
    let (handle, inbox) = UserAgentHandle::channel(8);
    let (packets, rx) = mpsc::channel(8);
    let worker = tokio::spawn(UserAgent::new(bob, Recorder::default(), inbox).run(rx));

    packets
        .send(packet(bytes::Bytes::from_static(b"garbage")))
        .await
        .unwrap();
    let invite = build_invite("sip:bob@127.0.0.1:5070", "z9hG4bKb2", "rt-2");
    packets.send(packet(encode(invite))).await.unwrap();

    let events = wait_for_events(&handle, 2).await;
    assert_eq!(events, vec!["listening", "invite rt-2"]);

    drop(packets);
    worker.await.unwrap().unwrap();
}
