//! # Worker Choreography
//!
//! Several foreground callers sharing one contract worker through the call
//! router. Responses must reach the caller that made the request, whatever
//! order the calls were issued in, and late responses must not disturb
//! later calls.

#[cfg(test)]
mod tests {
    use futures::future::join_all;
    use shared_types::{KeyPair, Network, PrivateKey, PublicKey, NANOMINA_PER_MINA};
    use std::sync::Arc;
    use std::time::Duration;
    use tl_01_call_router::{spawn_router, CallOptions, CancelToken, RouterConfig, RouterHandle};
    use tl_02_wallet_bridge::TransactionSink;
    use tl_04_contract_worker::{ContractDispatcher, ContractWorkerClient, SimulatedNetwork};

    struct Launch {
        network: SimulatedNetwork,
        client: ContractWorkerClient,
        handle: RouterHandle,
        payer: KeyPair,
    }

    fn launch() -> Launch {
        let network = SimulatedNetwork::new();
        let payer = SimulatedNetwork::keypair_from_seed("payer");
        network
            .fund(&payer.public_key, 100 * NANOMINA_PER_MINA)
            .unwrap();
        let dispatcher =
            ContractDispatcher::new(Arc::new(network.clone()), Arc::new(network.clone()));
        let (router, handle) = spawn_router(dispatcher, &RouterConfig::default()).unwrap();
        Launch {
            network,
            client: ContractWorkerClient::new(router),
            handle,
            payer,
        }
    }

    async fn submit(launch: &Launch) {
        let json = launch.client.get_transaction_json().await.unwrap();
        launch.network.submit(&json, 0, "").await.unwrap();
    }

    /// Deploy a token and mint `amounts[i]` to the i-th holder.
    async fn token_with_holders(launch: &Launch, amounts: &[u64]) -> (PublicKey, Vec<PublicKey>) {
        launch.client.initialize(Network::Devnet).await.unwrap();
        let deployed = launch
            .client
            .deploy_token(
                &launch.payer.private_key,
                "ABC",
                9,
                None,
                Network::Devnet,
                CallOptions::default(),
            )
            .await
            .unwrap();
        submit(launch).await;

        let token = PublicKey::from_base58(&deployed.contract_address).unwrap();
        let admin_key = PrivateKey::from_base58(&deployed.admin_private_key).unwrap();
        launch.client.init_zkapp_instance(&token).await.unwrap();

        let mut holders = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            let holder = SimulatedNetwork::keypair_from_seed(&format!("holder-{}", i)).public_key;
            launch
                .client
                .mint_token(
                    &launch.payer.public_key,
                    &holder,
                    *amount,
                    &admin_key,
                    &launch.payer.private_key,
                )
                .await
                .unwrap();
            submit(launch).await;
            holders.push(holder);
        }
        (token, holders)
    }

    #[tokio::test]
    async fn test_concurrent_callers_get_their_own_results() {
        let launch = launch();
        let amounts: Vec<u64> = (1..=8).map(|i| i * 11).collect();
        let (_token, holders) = token_with_holders(&launch, &amounts).await;

        let calls = holders.iter().map(|holder| {
            let client = launch.client.clone();
            let holder = holder.clone();
            tokio::spawn(async move { client.get_balance(&holder).await })
        });
        let balances: Vec<String> = join_all(calls)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let expected: Vec<String> = amounts.iter().map(u64::to_string).collect();
        assert_eq!(balances, expected);
        assert_eq!(launch.client.router().pending_count(), 0);
        launch.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_is_dropped_and_next_call_succeeds() {
        let launch = launch();
        launch.client.initialize(Network::Devnet).await.unwrap();
        launch.network.set_prove_delay(Duration::from_secs(60));

        let err = launch
            .client
            .deploy_token(
                &launch.payer.private_key,
                "ABC",
                9,
                None,
                Network::Devnet,
                CallOptions::default().with_timeout(Duration::from_secs(5)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // queued behind the slow deploy; its response follows the stale one
        let json = launch.client.get_transaction_json().await.unwrap();
        assert!(!json.is_empty());

        let stats = launch.client.router().stats();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.stale_responses, 1);
        assert_eq!(stats.pending, 0);
        launch.handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_deploy_releases_the_caller() {
        let launch = launch();
        launch.client.initialize(Network::Devnet).await.unwrap();
        launch.network.set_prove_delay(Duration::from_secs(60));

        let token = CancelToken::new();
        let client = launch.client.clone();
        let payer_key = launch.payer.private_key.clone();
        let options = CallOptions::default().with_cancel(token.clone());
        let call = tokio::spawn(async move {
            client
                .deploy_token(&payer_key, "ABC", 9, None, Network::Devnet, options)
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        let err = call.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(launch.client.router().stats().cancelled, 1);
        launch.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_calls_after_shutdown_fail_fast() {
        let launch = launch();
        let client = launch.client.clone();
        launch.handle.shutdown().await;

        let err = client.get_decimals().await.unwrap_err();
        assert!(err.worker_failure().is_none());
        assert_eq!(client.router().pending_count(), 0);
    }
}
