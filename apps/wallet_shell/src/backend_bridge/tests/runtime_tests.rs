use std::{
    net::TcpListener,
    time::{Duration, Instant},
};

use crossbeam_channel::bounded;

use super::*;

fn wait_for(ui_rx: &Receiver<UiEvent>, deadline: Instant, wanted: impl Fn(&UiEvent) -> bool) -> UiEvent {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = ui_rx
            .recv_timeout(remaining)
            .expect("ui event before deadline");
        if wanted(&event) {
            return event;
        }
    }
}

#[test]
fn disconnect_is_handled_while_connect_is_pending() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    // Connections land in the backlog and never get an answer.
    let silent = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = silent.local_addr().expect("addr");
    let settings = Settings {
        config_url: format!("http://{addr}/addresses.json"),
        http_timeout_secs: 30,
        ..Settings::default()
    };
    let (cmd_tx, cmd_rx) = bounded(8);
    let (ui_tx, ui_rx) = bounded(64);
    let backend = spawn_backend_thread(
        BackendConfig {
            settings,
            ephemeral: true,
        },
        cmd_rx,
        ui_tx,
    );
    let deadline = Instant::now() + Duration::from_secs(10);

    cmd_tx.send(BackendCommand::Connect).expect("send connect");
    wait_for(&ui_rx, deadline, |event| {
        matches!(
            event,
            UiEvent::Session(SessionEvent::PhaseChanged(SessionPhase::Connecting))
        )
    });
    cmd_tx.send(BackendCommand::Disconnect).expect("send disconnect");

    let UiEvent::Snapshot(snapshot) = wait_for(&ui_rx, deadline, |event| {
        matches!(event, UiEvent::Snapshot(snapshot) if snapshot.phase == SessionPhase::Disconnected)
    }) else {
        unreachable!();
    };
    assert!(snapshot.account.is_none());
    assert!(snapshot.last_error.is_none());

    drop(cmd_tx);
    backend.join().expect("backend thread");
}
