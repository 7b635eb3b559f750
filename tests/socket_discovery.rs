//! Tests for socket target resolution.
//!
//! Covers ordering, deduplication, existence filtering, glob errors, the
//! `TMUX` environment socket, and lisa-provided paths.

mod test_utils;

use muxboard::sockets::{discover_socket_targets, socket_key, SocketTarget, DEFAULT_SOCKET_KEY};
use test_utils::bare_config;

mod resolver {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn explicit_sockets_keep_order_and_dedup() {
        let tmp = tempfile::TempDir::new().unwrap();
        let socket_a = tmp.path().join("a.sock");
        std::fs::write(&socket_a, "a").unwrap();
        let missing = tmp.path().join("missing.sock");

        let mut config = bare_config();
        config.include_default_socket = true;
        config.sockets = vec![
            socket_a.to_string_lossy().to_string(),
            missing.to_string_lossy().to_string(),
            socket_a.to_string_lossy().to_string(),
        ];

        let lisa = test_utils::empty_lisa_source();
        let (targets, errors) = discover_socket_targets(&config, &lisa, "").await;

        assert_eq!(errors, Vec::<String>::new());
        let paths: Vec<String> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                String::new(),
                socket_a.to_string_lossy().to_string(),
                // Absent explicit sockets are kept so the listing stage
                // reports them rather than silently dropping them.
                missing.to_string_lossy().to_string(),
            ]
        );
        assert_eq!(targets[0].key, DEFAULT_SOCKET_KEY);
    }

    #[tokio::test]
    async fn glob_matches_require_existing_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let socket_a = tmp.path().join("a.sock");
        let socket_b = tmp.path().join("b.sock");
        std::fs::write(&socket_a, "a").unwrap();
        std::fs::write(&socket_b, "b").unwrap();

        let mut config = bare_config();
        config.include_lisa_sockets = true;
        config.socket_glob = tmp.path().join("*.sock").to_string_lossy().to_string();

        let lisa = test_utils::empty_lisa_source();
        let (targets, errors) = discover_socket_targets(&config, &lisa, "").await;

        assert_eq!(errors, Vec::<String>::new());
        let paths: Vec<String> = targets.iter().map(|t| t.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                socket_a.to_string_lossy().to_string(),
                socket_b.to_string_lossy().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_glob_is_a_discovery_error() {
        let mut config = bare_config();
        config.include_lisa_sockets = true;
        config.socket_glob = "[".to_string();

        let lisa = test_utils::empty_lisa_source();
        let (targets, errors) = discover_socket_targets(&config, &lisa, "").await;

        assert!(targets.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("socket-glob"), "error = {:?}", errors[0]);
    }

    #[tokio::test]
    async fn env_socket_joins_the_default_server() {
        let mut config = bare_config();
        config.include_default_socket = true;

        let lisa = test_utils::empty_lisa_source();
        let (targets, errors) =
            discover_socket_targets(&config, &lisa, "/tmp/lisa-a.sock,17,0").await;

        assert_eq!(errors, Vec::<String>::new());
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].path, "");
        assert_eq!(targets[1].path, "/tmp/lisa-a.sock");
    }

    #[tokio::test]
    async fn default_shaped_env_socket_is_not_duplicated() {
        let mut config = bare_config();
        config.include_default_socket = true;

        let lisa = test_utils::empty_lisa_source();
        let (targets, _) =
            discover_socket_targets(&config, &lisa, "/tmp/tmux-1000/default,9,0").await;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].key, DEFAULT_SOCKET_KEY);
    }

    #[tokio::test]
    async fn lisa_paths_are_added_without_existence_check() {
        let tmp = tempfile::TempDir::new().unwrap();
        let from_lisa = tmp.path().join("lisa-from-helper.sock");

        let mut config = bare_config();
        config.include_lisa_sockets = true;
        config.socket_glob = tmp.path().join("*.sock").to_string_lossy().to_string();

        let process_table = test_utils::ScriptedProcessTable::with_lines(vec![format!(
            "tmux -S {} new -d",
            from_lisa.to_string_lossy()
        )]);
        let lisa = std::sync::Arc::new(muxboard::sockets::lisa::LisaSocketSource::new(
            test_utils::ScriptedLisa::not_installed(),
            process_table,
            std::time::Duration::from_secs(60),
        ));

        let (targets, errors) = discover_socket_targets(&config, &lisa, "").await;
        assert_eq!(errors, Vec::<String>::new());
        let keys: Vec<String> = targets.iter().map(|t| t.key.clone()).collect();
        assert!(
            keys.contains(&socket_key(&from_lisa.to_string_lossy())),
            "missing lisa socket target: {:?}",
            keys
        );
    }

    #[tokio::test]
    async fn lisa_failure_is_a_discovery_error_not_a_stop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let socket_a = tmp.path().join("a.sock");
        std::fs::write(&socket_a, "a").unwrap();

        let mut config = bare_config();
        config.include_lisa_sockets = true;
        config.socket_glob = tmp.path().join("*.sock").to_string_lossy().to_string();

        let lisa = std::sync::Arc::new(muxboard::sockets::lisa::LisaSocketSource::new(
            test_utils::ScriptedLisa::not_installed(),
            test_utils::ScriptedProcessTable::failing("ps exploded"),
            std::time::Duration::from_secs(60),
        ));

        let (targets, errors) = discover_socket_targets(&config, &lisa, "").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("lisa-sockets"), "error = {:?}", errors[0]);
        assert!(errors[0].contains("ps exploded"), "error = {:?}", errors[0]);
    }
}

mod identity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn targets_are_identified_by_canonical_key() {
        let a = SocketTarget::new("/tmp//x/./a.sock");
        let b = SocketTarget::new("/tmp/x/a.sock");
        assert_eq!(a.key, b.key);
        assert_eq!(a.hint, "a");
    }

    #[test]
    fn default_target_has_sentinel_key() {
        let target = SocketTarget::new("");
        assert_eq!(target.path, "");
        assert_eq!(target.key, DEFAULT_SOCKET_KEY);
        assert_eq!(target.hint, DEFAULT_SOCKET_KEY);
    }
}
