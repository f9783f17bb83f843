use super::*;
use axum::{extract::State, routing::post, Json, Router};
use tokio::{net::TcpListener, sync::Mutex};

const OWNER: &str = "0x1111111111111111111111111111111111111111";
const TOKEN: &str = "0x2222222222222222222222222222222222222222";
const RECIPIENT: &str = "0x3333333333333333333333333333333333333333";

#[derive(Clone, Default)]
struct NodeState {
    calls: Arc<Mutex<Vec<Value>>>,
    receipt: Option<Value>,
}

async fn handle_rpc(State(state): State<NodeState>, Json(request): Json<Value>) -> Json<Value> {
    state.calls.lock().await.push(request.clone());
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();
    let result = match method {
        "eth_accounts" => json!([OWNER]),
        "eth_call" => {
            let data = request["params"][0]["data"].as_str().unwrap_or_default();
            if data.starts_with("0x70a08231") {
                json!(format!("0x{:0>64}", "de0b6b3a7640000"))
            } else {
                json!(format!("0x{:0>64}", "12"))
            }
        }
        "eth_sendTransaction" => json!(format!("0x{}", "ab".repeat(32))),
        "eth_getTransactionReceipt" => state.receipt.clone().unwrap_or(Value::Null),
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": "method not found" }
            }))
        }
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn spawn_node(receipt: Option<Value>) -> anyhow::Result<(Url, NodeState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = NodeState {
        calls: Arc::new(Mutex::new(Vec::new())),
        receipt,
    };
    let app = Router::new()
        .route("/", post(handle_rpc))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("http://{addr}/"))?, state))
}

async fn transport_for(url: Url, role: NetworkRole) -> Arc<dyn WalletTransport> {
    JsonRpcConnector::new(DEFAULT_RPC_TIMEOUT)
        .expect("connector")
        .connect(TransportOptions { host: url, role })
        .await
        .expect("transport")
}

fn address(raw: &str) -> AccountAddress {
    AccountAddress::parse(raw).expect("address")
}

#[tokio::test]
async fn accounts_publish_connected_once() {
    let (url, _) = spawn_node(None).await.expect("node");
    let transport = transport_for(url, NetworkRole::Sidechain).await;
    let mut events = transport.subscribe_events();

    let accounts = transport.accounts().await.expect("accounts");
    transport.accounts().await.expect("accounts again");

    assert_eq!(accounts, vec![address(OWNER)]);
    assert_eq!(
        events.recv().await.expect("event"),
        TransportEvent::Connected(NetworkRole::Sidechain)
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn reads_token_balance_and_decimals_with_eth_call() {
    let (url, state) = spawn_node(None).await.expect("node");
    let transport = transport_for(url, NetworkRole::Sidechain).await;

    let balance = transport
        .token_balance_of(&address(TOKEN), &address(OWNER))
        .await
        .expect("balance");
    let decimals = transport
        .token_decimals(&address(TOKEN))
        .await
        .expect("decimals");

    assert_eq!(balance.to_string(), "1000000000000000000");
    assert_eq!(decimals, 18);

    let calls = state.calls.lock().await;
    assert_eq!(calls[0]["params"][0]["to"], TOKEN);
    assert_eq!(calls[0]["params"][1], "latest");
    assert_eq!(
        calls[0]["params"][0]["data"],
        abi::balance_of_call(&address(OWNER))
    );
}

#[tokio::test]
async fn bridge_transfer_sends_erc20_calldata_from_account() {
    let (side_url, state) = spawn_node(None).await.expect("side node");
    let (root_url, _) = spawn_node(None).await.expect("root node");
    let sidechain = transport_for(side_url, NetworkRole::Sidechain).await;
    let rootchain = transport_for(root_url, NetworkRole::Rootchain).await;

    let bridge = TokenBridgeConnector
        .build(BridgeOptions {
            sidechain,
            rootchain,
            contracts: BridgeContracts {
                root_chain: address("0x4444444444444444444444444444444444444444"),
                withdraw_manager: address("0x5555555555555555555555555555555555555555"),
                deposit_manager: address("0x6666666666666666666666666666666666666666"),
                child_weth: address("0x7777777777777777777777777777777777777777"),
            },
            syncer_url: None,
            watcher_url: None,
        })
        .await
        .expect("bridge");

    let amount = BigInt::from(10_000_000_000_000_000u64);
    let tx_hash = bridge
        .transfer_tokens(TokenTransfer {
            token: address(TOKEN),
            recipient: address(RECIPIENT),
            amount: amount.clone(),
            from: address(OWNER),
        })
        .await
        .expect("transfer");

    assert_eq!(tx_hash.as_str(), format!("0x{}", "ab".repeat(32)));
    let calls = state.calls.lock().await;
    let sent = &calls[0];
    assert_eq!(sent["method"], "eth_sendTransaction");
    assert_eq!(sent["params"][0]["from"], OWNER);
    assert_eq!(sent["params"][0]["to"], TOKEN);
    assert_eq!(
        sent["params"][0]["data"],
        abi::transfer_call(&address(RECIPIENT), &amount).expect("calldata")
    );
}

#[tokio::test]
async fn bridge_rejects_swapped_transports() {
    let (url, _) = spawn_node(None).await.expect("node");
    let sidechain = transport_for(url.clone(), NetworkRole::Sidechain).await;
    let rootchain = transport_for(url, NetworkRole::Rootchain).await;
    let contracts = BridgeContracts {
        root_chain: address(TOKEN),
        withdraw_manager: address(TOKEN),
        deposit_manager: address(TOKEN),
        child_weth: address(TOKEN),
    };

    let result = TokenBridgeConnector
        .build(BridgeOptions {
            sidechain: rootchain,
            rootchain: sidechain,
            contracts,
            syncer_url: None,
            watcher_url: None,
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn pending_receipt_is_none_and_mined_receipt_reports_status() {
    let hash = TxHash::parse(&format!("0x{}", "cd".repeat(32))).expect("hash");

    let (url, _) = spawn_node(None).await.expect("node");
    let pending = transport_for(url, NetworkRole::Sidechain).await;
    assert_eq!(pending.transaction_receipt(&hash).await.expect("receipt"), None);

    let (url, _) = spawn_node(Some(json!({ "blockNumber": "0x10", "status": "0x0" })))
        .await
        .expect("node");
    let mined = transport_for(url, NetworkRole::Sidechain).await;
    let receipt = mined
        .transaction_receipt(&hash)
        .await
        .expect("receipt")
        .expect("mined");
    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.status, ReceiptStatus::Reverted);
}

#[tokio::test]
async fn remote_errors_surface_code_and_message() {
    let (url, _) = spawn_node(None).await.expect("node");
    let transport = JsonRpcTransport::new(
        Client::new(),
        TransportOptions {
            host: url,
            role: NetworkRole::Rootchain,
        },
    );

    let err = transport
        .request_value("eth_chainId", json!([]))
        .await
        .expect_err("unknown method");
    assert!(matches!(err, RpcError::Remote { code: -32601, .. }));
}

#[tokio::test]
async fn disconnect_publishes_only_after_connect() {
    let (url, _) = spawn_node(None).await.expect("node");
    let transport = transport_for(url, NetworkRole::Rootchain).await;
    let mut events = transport.subscribe_events();

    transport.disconnect().await.expect("noop disconnect");
    assert!(events.try_recv().is_err());

    transport.accounts().await.expect("accounts");
    transport.disconnect().await.expect("disconnect");
    assert_eq!(
        events.recv().await.expect("connected"),
        TransportEvent::Connected(NetworkRole::Rootchain)
    );
    assert_eq!(
        events.recv().await.expect("disconnected"),
        TransportEvent::Disconnected(NetworkRole::Rootchain)
    );
}

#[tokio::test]
async fn connector_rejects_non_http_endpoints() {
    let connector = JsonRpcConnector::new(DEFAULT_RPC_TIMEOUT).expect("connector");
    let result = connector
        .connect(TransportOptions {
            host: Url::parse("ws://127.0.0.1:8546").expect("url"),
            role: NetworkRole::Sidechain,
        })
        .await;
    assert!(result.is_err());
}
