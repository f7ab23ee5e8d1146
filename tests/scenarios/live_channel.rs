/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tinydag::prefs::ReconnectPreferences;
use tinydag::session::{EditorSession, InboundOutcome, SyncTransport};
use tinydag::sync::{SyncChannel, SyncChannelParts, SyncEvent};
use tinydag_canvas::CanvasConfig;
use tinydag_core::{Connection, GraphStore, SyncMessage};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::harness::{graph_update_frame, screen, snapshot};

const STEP: Duration = Duration::from_secs(5);

async fn next_event(events: &mut mpsc::UnboundedReceiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(STEP, events.recv())
        .await
        .expect("sync event in time")
        .expect("event stream open")
}

#[tokio::test]
async fn mirrors_remote_state_and_publishes_local_edits() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let remote = snapshot(&[(1, 0.0, 0.0), (4, 300.0, 200.0)], &[(1, 4)]);
    let greeting = graph_update_frame(remote.clone());
    let (received_tx, received_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        socket.send(Message::Text(greeting.into())).await.unwrap();
        while let Some(Ok(message)) = socket.next().await {
            if let Message::Text(text) = message {
                let _ = received_tx.send(text.as_str().to_owned());
                break;
            }
        }
        // Hold the socket until the client closes it.
        while let Some(Ok(_)) = socket.next().await {}
    });

    let cancel = CancellationToken::new();
    let SyncChannelParts {
        channel,
        mut events,
        worker,
    } = SyncChannel::spawn(
        Url::parse(&format!("ws://{address}/ws")).unwrap(),
        ReconnectPreferences {
            min_delay_ms: 10,
            max_delay_ms: 50,
            max_attempts: 3,
        },
        cancel.clone(),
    );
    let mut session = EditorSession::new(
        GraphStore::from_snapshot(Default::default()),
        screen(),
        CanvasConfig::default(),
        channel,
    );

    assert_eq!(next_event(&mut events).await, SyncEvent::Connected);
    assert!(session.transport().is_open());

    let SyncEvent::Inbound(text) = next_event(&mut events).await else {
        panic!("expected an inbound frame");
    };
    assert_eq!(session.apply_inbound(&text), InboundOutcome::Applied);
    assert_eq!(session.store().snapshot(), remote);

    assert_eq!(session.add_node_from(4), Some(5));
    let frame = tokio::time::timeout(STEP, received_rx)
        .await
        .expect("server received a frame in time")
        .unwrap();
    let published = SyncMessage::decode(&frame).unwrap().into_snapshot();
    assert_eq!(published.nodes.len(), 3);
    assert!(published.connections.contains(&Connection::new(4, 5)));

    cancel.cancel();
    tokio::time::timeout(STEP, worker).await.unwrap().unwrap();
    assert!(!session.transport().is_open());
    tokio::time::timeout(STEP, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn gives_up_when_server_is_unreachable() {
    // Bind then drop so the port refuses connections.
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let cancel = CancellationToken::new();
    let SyncChannelParts {
        mut channel,
        mut events,
        worker,
    } = SyncChannel::spawn(
        Url::parse(&format!("ws://{address}/ws")).unwrap(),
        ReconnectPreferences {
            min_delay_ms: 5,
            max_delay_ms: 10,
            max_attempts: 2,
        },
        cancel,
    );

    assert!(!channel.is_open());
    channel.publish(graph_update_frame(snapshot(&[(1, 0.0, 0.0)], &[])));
    assert_eq!(next_event(&mut events).await, SyncEvent::GaveUp);
    tokio::time::timeout(STEP, worker).await.unwrap().unwrap();
    assert!(!channel.is_open());
}
