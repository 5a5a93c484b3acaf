// Connection parameter providers end to end:
//  - conninfo callback merges token and host into the base string
//  - before-connect hook mutates caller parameters in place
//  - host resolution happens once at build time, tokens per call

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use crate::cache::TokenSupplier;
    use crate::conninfo::ConnParams;
    use crate::errors::ConnectorError;
    use crate::instance::{InstanceMetadata, IpType};
    use crate::provider::{ConnInfoProvider, Connector};
    use crate::sources::StaticTokenSource;
    use crate::tests::common::{FakeCredentialSource, FakeDirectory};

    fn static_supplier(token: &str) -> TokenSupplier {
        TokenSupplier::builder()
            .source(Arc::new(StaticTokenSource::new(token)))
            .build()
    }

    #[tokio::test]
    async fn token_is_injected_and_base_host_kept() {
        let provider = ConnInfoProvider::builder()
            .token_supplier(static_supplier("tok1"))
            .build_conninfo("postgresql://user@host/db")
            .await
            .unwrap();

        let conninfo = provider.conninfo().await.unwrap();
        assert!(conninfo.contains("password=tok1"), "{conninfo}");
        assert!(conninfo.contains("host=host"), "{conninfo}");
        assert_eq!(conninfo, "user=user host=host dbname=db password=tok1");
    }

    #[tokio::test]
    async fn resolved_instance_address_is_injected() {
        let directory = FakeDirectory::with_public("1.2.3.4");
        let provider = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(directory.clone())
            .token_supplier(static_supplier("tok2"))
            .build_conninfo("postgresql://user@/db")
            .await
            .unwrap();

        let conninfo = provider.conninfo().await.unwrap();
        assert!(conninfo.contains("host=1.2.3.4"), "{conninfo}");
        assert!(conninfo.contains("password=tok2"), "{conninfo}");
        assert_eq!(provider.connector().host(), Some("1.2.3.4"));
        assert_eq!(directory.fetches(), 1);
    }

    #[tokio::test]
    async fn iam_auth_disabled_omits_password() {
        let source = FakeCredentialSource::new("unused");
        let provider = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::with_public("1.2.3.4"))
            .credential_source(source.clone())
            .enable_iam_auth(false)
            .build_conninfo("postgresql://user@/db")
            .await
            .unwrap();

        let conninfo = provider.conninfo().await.unwrap();
        assert!(conninfo.contains("host=1.2.3.4"), "{conninfo}");
        assert!(!conninfo.contains("password="), "{conninfo}");
        assert!(!provider.connector().iam_auth_enabled());
        assert_eq!(source.discovers(), 0);
    }

    #[tokio::test]
    async fn iam_auth_disabled_ignores_supplied_token_supplier() {
        let source = FakeCredentialSource::new("unused");
        let supplier = TokenSupplier::builder().source(source.clone()).build();
        let provider = ConnInfoProvider::builder()
            .token_supplier(supplier)
            .enable_iam_auth(false)
            .build_conninfo("postgresql://user@host/db")
            .await
            .unwrap();

        let conninfo = provider.conninfo().await.unwrap();
        assert_eq!(conninfo, "user=user host=host dbname=db");
        assert!(!conninfo.contains("password="), "{conninfo}");
        assert!(provider.connector().token_supplier().is_none());
        assert_eq!(source.discovers() + source.refreshes(), 0);
    }

    #[tokio::test]
    async fn hook_with_iam_disabled_ignores_supplied_token_supplier() {
        let source = FakeCredentialSource::new("unused");
        let supplier = TokenSupplier::builder().source(source.clone()).build();
        let hook = Connector::builder()
            .token_supplier(supplier)
            .enable_iam_auth(false)
            .build_hook()
            .await
            .unwrap();

        let mut params = ConnParams::new().with("host", "db.internal").with("user", "app");
        hook.before_connect(&mut params).await.unwrap();

        assert_eq!(params.get("password"), None);
        assert_eq!(params.to_conninfo(), "host=db.internal user=app");
        assert!(hook.connector().token_supplier().is_none());
        assert_eq!(source.discovers() + source.refreshes(), 0);
    }

    #[tokio::test]
    async fn resolved_host_replaces_base_host_and_password() {
        let provider = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::with_metadata(
                InstanceMetadata::default().with_address(IpType::Private, "10.0.0.5"),
            ))
            .ip_type(IpType::Private)
            .token_supplier(static_supplier("fresh"))
            .build_conninfo("host=old.example port=5432 user=sa password=stale dbname=app")
            .await
            .unwrap();

        let params = provider.params().await.unwrap();
        assert_eq!(params.get("host"), Some("10.0.0.5"));
        assert_eq!(params.get("password"), Some("fresh"));
        assert_eq!(params.get("port"), Some("5432"));
        assert_eq!(
            params.to_conninfo(),
            "host=10.0.0.5 port=5432 user=sa password=fresh dbname=app"
        );
    }

    #[tokio::test]
    async fn host_is_resolved_once_token_fetched_per_call() {
        let directory = FakeDirectory::with_public("1.2.3.4");
        // lifetime inside the safety margin forces a refresh on each call
        let source = FakeCredentialSource::with_lifetime("tok", 30);
        let provider = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(directory.clone())
            .credential_source(source.clone())
            .build_conninfo("user=sa dbname=db")
            .await
            .unwrap();

        let first = provider.conninfo().await.unwrap();
        let second = provider.conninfo().await.unwrap();
        assert!(first.contains("password=tok-1"), "{first}");
        assert!(second.contains("password=tok-2"), "{second}");
        assert_eq!(directory.fetches(), 1);
        assert_eq!(source.discovers() + source.refreshes(), 2);
    }

    #[tokio::test]
    async fn password_with_spaces_is_quoted() {
        let provider = ConnInfoProvider::builder()
            .token_supplier(static_supplier("a b'c"))
            .build_conninfo("dbname=db")
            .await
            .unwrap();
        assert_eq!(provider.conninfo().await.unwrap(), r"dbname=db password='a b\'c'");
    }

    #[tokio::test]
    async fn build_fails_fast_on_invalid_identifier() {
        let directory = FakeDirectory::with_public("1.2.3.4");
        let err = ConnInfoProvider::builder()
            .instance_connection_name("proj:inst")
            .directory(directory.clone())
            .token_supplier(static_supplier("tok"))
            .build_conninfo("dbname=db")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidIdentifier { .. }), "{err}");
        assert_eq!(directory.fetches(), 0);
    }

    #[tokio::test]
    async fn build_fails_fast_on_directory_error() {
        let source = FakeCredentialSource::new("tok");
        let err = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::failing("connection refused"))
            .credential_source(source.clone())
            .build_conninfo("dbname=db")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::MetadataFetch { .. }), "{err}");
        // token acquisition stays lazy
        assert_eq!(source.discovers(), 0);
    }

    #[tokio::test]
    async fn build_fails_fast_on_missing_address_type() {
        let err = Connector::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::with_public("1.2.3.4"))
            .ip_type(IpType::Private)
            .token_supplier(static_supplier("tok"))
            .build_hook()
            .await
            .unwrap_err();
        assert!(
            matches!(err, ConnectorError::AddressNotFound { ip_type: IpType::Private, .. }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn malformed_base_conninfo_surfaces_per_call() {
        let provider = ConnInfoProvider::builder()
            .token_supplier(static_supplier("tok"))
            .build_conninfo("host='unterminated")
            .await
            .unwrap();
        let err = provider.conninfo().await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidConninfo(_)), "{err}");
    }

    #[tokio::test]
    async fn token_failure_surfaces_from_provider() {
        let source = FakeCredentialSource::new("tok");
        source.fail(true);
        let provider = ConnInfoProvider::builder()
            .credential_source(source.clone())
            .build_conninfo("dbname=db")
            .await
            .unwrap();

        let err = provider.conninfo().await.unwrap_err();
        assert!(matches!(err, ConnectorError::AuthResolution(_)), "{err}");

        source.fail(false);
        assert_eq!(provider.conninfo().await.unwrap(), "dbname=db password=tok-1");
    }

    #[tokio::test]
    async fn hook_sets_password_and_host_in_place() {
        let hook = Connector::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::with_public("1.2.3.4"))
            .token_supplier(static_supplier("tok3"))
            .build_hook()
            .await
            .unwrap();

        let mut params: ConnParams = [("user", "sa"), ("host", "placeholder"), ("dbname", "db")]
            .into_iter()
            .collect();
        hook.before_connect(&mut params).await.unwrap();

        assert_eq!(params.get("host"), Some("1.2.3.4"));
        assert_eq!(params.get("password"), Some("tok3"));
        assert_eq!(params.get("user"), Some("sa"));
        assert_eq!(params.len(), 4);
        assert!(!params.to_string().contains("tok3"));
    }

    #[tokio::test]
    async fn hook_without_instance_or_iam_leaves_params_alone() {
        let hook = Connector::builder()
            .enable_iam_auth(false)
            .build_hook()
            .await
            .unwrap();

        let mut params = ConnParams::new().with("host", "db.internal").with("user", "app");
        hook.before_connect(&mut params).await.unwrap();
        assert_eq!(params.to_conninfo(), "host=db.internal user=app");
    }

    #[tokio::test]
    async fn hook_error_leaves_params_untouched() {
        let source = FakeCredentialSource::new("tok");
        source.fail(true);
        let hook = Connector::builder()
            .instance_connection_name("proj:region:inst")
            .directory(FakeDirectory::with_public("1.2.3.4"))
            .credential_source(source)
            .build_hook()
            .await
            .unwrap();

        let mut params = ConnParams::new().with("host", "placeholder");
        assert!(hook.before_connect(&mut params).await.is_err());
        assert_eq!(params.to_conninfo(), "host=placeholder");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn provider_clones_serve_concurrent_pool_connects() {
        let directory = FakeDirectory::with_public("1.2.3.4");
        let source = FakeCredentialSource::new("tok");
        let provider = ConnInfoProvider::builder()
            .instance_connection_name("proj:region:inst")
            .directory(directory.clone())
            .credential_source(source.clone())
            .build_conninfo("postgresql://sa@/db")
            .await
            .unwrap();
        provider.conninfo().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.conninfo().await }));
        }
        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap(),
                "user=sa dbname=db password=tok-1 host=1.2.3.4"
            );
        }
        assert_eq!(directory.fetches(), 1);
        assert_eq!(source.discovers(), 1);
    }
}
