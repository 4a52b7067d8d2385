//! # Launcher Flows
//!
//! Drives the `token-launcher` flows end to end against the simulated network:
//! the contract worker behind the call router, the development wallet and the
//! token list on disk.

#[cfg(test)]
mod tests {
    use launcher_runtime::flows::{self, DeployParams, MintParams, TransferParams};
    use launcher_runtime::{execute, Command, LauncherConfig, LauncherContext, TokensCommand};
    use shared_types::{Network, PublicKey, TokenStatus, NANOMINA_PER_MINA};
    use std::path::Path;
    use tl_02_wallet_bridge::WalletError;
    use tl_04_contract_worker::SimulatedNetwork;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn simulated(dir: &Path) -> LauncherContext {
        LauncherContext::open(LauncherConfig {
            data_dir: dir.to_path_buf(),
            simulate: true,
            ..LauncherConfig::default()
        })
        .unwrap()
    }

    fn deploy_params() -> DeployParams {
        DeployParams {
            symbol: "ABC".into(),
            decimals: 9,
            src: None,
            fee_payer_key: None,
        }
    }

    async fn deploy_and_mint(context: &LauncherContext, amount: u64) -> PublicKey {
        let report = flows::deploy(context, deploy_params()).await.unwrap();
        let token = PublicKey::from_base58(&report.token.address).unwrap();
        flows::mint(
            context,
            MintParams {
                token: token.clone(),
                amount,
                recipient: None,
                admin_key: None,
                fee_payer_key: None,
            },
        )
        .await
        .unwrap();
        token
    }

    // =============================================================================
    // DEPLOY
    // =============================================================================

    #[tokio::test]
    async fn test_deploy_saves_token_and_links_explorer() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());

        let report = flows::deploy(&context, deploy_params()).await.unwrap();

        assert_eq!(report.token.status, TokenStatus::Launched);
        assert!(report.token.admin_public_key.is_some());
        assert!(report.token.admin_private_key.is_some());
        assert_eq!(
            report.broadcast.link,
            format!(
                "https://minascan.io/devnet/tx/{}/txInfo",
                report.broadcast.hash
            )
        );

        let saved = context.registry.list().unwrap();
        assert_eq!(saved, vec![report.token.clone()]);

        let token = PublicKey::from_base58(&report.token.address).unwrap();
        let network = &context.backend().unwrap().network;
        assert_eq!(network.token_symbol(&token).as_deref(), Some("ABC"));
        assert_eq!(network.transactions(), vec![report.broadcast.hash.clone()]);

        assert_eq!(context.router_stats().unwrap().pending, 0);
        context.close().await;
    }

    #[tokio::test]
    async fn test_deploy_charges_the_wallet_fee() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());
        let account = context.wallet_account().await.unwrap();
        let before = context.backend().unwrap().network.balance(&account).unwrap();

        flows::deploy(&context, deploy_params()).await.unwrap();

        let after = context.backend().unwrap().network.balance(&account).unwrap();
        // wallet fee plus three new accounts
        assert!(before - after >= NANOMINA_PER_MINA / 10 + 3 * NANOMINA_PER_MINA);
        context.close().await;
    }

    // =============================================================================
    // MINT, TRANSFER, BALANCE
    // =============================================================================

    #[tokio::test]
    async fn test_mint_transfer_and_balances() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());
        let token = deploy_and_mint(&context, 99).await;
        let bob = SimulatedNetwork::keypair_from_seed("bob").public_key;

        let own = flows::balance(&context, &token, None).await.unwrap();
        assert_eq!(own.balance, "99");

        flows::transfer(
            &context,
            TransferParams {
                token: token.clone(),
                to: bob.clone(),
                amount: 40,
            },
        )
        .await
        .unwrap();

        let own = flows::balance(&context, &token, None).await.unwrap();
        assert_eq!(own.balance, "59");
        let theirs = flows::balance(&context, &token, Some(bob.clone()))
            .await
            .unwrap();
        assert_eq!(theirs.balance, "40");
        assert_eq!(theirs.owner, bob.to_string());

        let info = flows::info(&context, &token).await.unwrap();
        assert_eq!(info.decimals, "9");
        assert_eq!(info.circulating, "99");
        assert!(info.admin_contract.is_some());
        context.close().await;
    }

    #[tokio::test]
    async fn test_transfer_more_than_balance_fails() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());
        let token = deploy_and_mint(&context, 10).await;
        let bob = SimulatedNetwork::keypair_from_seed("bob").public_key;

        let err = flows::transfer(
            &context,
            TransferParams {
                token: token.clone(),
                to: bob,
                amount: 11,
            },
        )
        .await
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to"));

        let own = flows::balance(&context, &token, None).await.unwrap();
        assert_eq!(own.balance, "10");
        context.close().await;
    }

    #[tokio::test]
    async fn test_mint_without_saved_admin_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());
        let report = flows::deploy(&context, deploy_params()).await.unwrap();
        assert!(context.registry.remove(&report.token.id).unwrap());

        let err = flows::mint(
            &context,
            MintParams {
                token: PublicKey::from_base58(&report.token.address).unwrap(),
                amount: 1,
                recipient: None,
                admin_key: None,
                fee_payer_key: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("pass --admin-key"));
        context.close().await;
    }

    // =============================================================================
    // PERSISTENCE ACROSS INVOCATIONS
    // =============================================================================

    #[tokio::test]
    async fn test_state_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let context = simulated(dir.path());
        let token = deploy_and_mint(&context, 25).await;
        context.close().await;

        let reopened = simulated(dir.path());
        let balance = flows::balance(&reopened, &token, None).await.unwrap();
        assert_eq!(balance.balance, "25");
        assert_eq!(reopened.registry.list().unwrap().len(), 1);

        let account = reopened.wallet_account().await.unwrap();
        let nonce = flows::nonce(&reopened, &account).await.unwrap();
        assert_eq!(nonce, 2);
        reopened.close().await;
    }

    // =============================================================================
    // COMMANDS WITHOUT A CONTRACT BACKEND
    // =============================================================================

    #[tokio::test]
    async fn test_registry_commands_work_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let context = LauncherContext::open(LauncherConfig {
            data_dir: dir.path().to_path_buf(),
            ..LauncherConfig::default()
        })
        .unwrap();

        let imported = execute(
            &context,
            Command::Tokens {
                action: TokensCommand::Import {
                    address: "B62qimported".into(),
                    admin_public_key: Some("  ".into()),
                    admin_private_key: None,
                },
            },
        )
        .await
        .unwrap();
        assert!(imported.starts_with("Imported B62qimported"));

        let listed = execute(
            &context,
            Command::Tokens {
                action: TokensCommand::List,
            },
        )
        .await
        .unwrap();
        assert!(listed.contains("B62qimported"));
        assert!(listed.contains("Launched"));

        let id = context.registry.list().unwrap()[0].id.clone();
        let err = execute(
            &context,
            Command::Tokens {
                action: TokensCommand::Remove { id: "missing".into() },
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "No token with id missing");
        execute(
            &context,
            Command::Tokens {
                action: TokensCommand::Remove { id },
            },
        )
        .await
        .unwrap();
        assert!(context.registry.list().unwrap().is_empty());

        let set = execute(
            &context,
            Command::Network {
                network: Some(Network::Mainnet),
            },
        )
        .await
        .unwrap();
        assert_eq!(set, "Network set to Mainnet");
        assert_eq!(context.registry.network().unwrap(), Network::Mainnet);
        context.close().await;
    }

    #[tokio::test]
    async fn test_contract_flows_need_a_backend() {
        let dir = tempfile::tempdir().unwrap();
        let context = LauncherContext::open(LauncherConfig {
            data_dir: dir.path().to_path_buf(),
            ..LauncherConfig::default()
        })
        .unwrap();

        let err = flows::deploy(&context, deploy_params()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No contract backend for Devnet; run with --simulate"
        );
        assert!(matches!(context.wallet(), Err(WalletError::NotDetected)));
        context.close().await;
    }
}
