//! Spawns and manages parleyd instances for integration testing.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// The 59 privilege columns of the server_privileges table.
const PRIVILEGE_COLUMNS: &[&str] = &[
    "adm_del_server",
    "adm_add_server",
    "adm_list_servers",
    "adm_set_permissions",
    "adm_change_user_pass",
    "adm_change_own_pass",
    "adm_list_registrations",
    "adm_register_player",
    "adm_change_server_codecs",
    "adm_change_server_type",
    "adm_change_server_pass",
    "adm_change_server_welcome",
    "adm_change_server_maxusers",
    "adm_change_server_name",
    "adm_change_webpost_url",
    "adm_change_server_port",
    "adm_start_server",
    "adm_stop_server",
    "adm_move_player",
    "adm_ban_ip",
    "cha_delete",
    "cha_create_moderated",
    "cha_create_subchanneled",
    "cha_create_default",
    "cha_create_unregistered",
    "cha_create_registered",
    "cha_join_registered",
    "cha_join_wo_pass",
    "cha_change_codec",
    "cha_change_maxusers",
    "cha_change_order",
    "cha_change_desc",
    "cha_change_topic",
    "cha_change_pass",
    "cha_change_name",
    "pl_grant_allowreg",
    "pl_grant_voice",
    "pl_grant_autovoice",
    "pl_grant_op",
    "pl_grant_autoop",
    "pl_grant_ca",
    "pl_grant_sa",
    "pl_register_player",
    "pl_revoke_allowreg",
    "pl_revoke_voice",
    "pl_revoke_autovoice",
    "pl_revoke_op",
    "pl_revoke_autoop",
    "pl_revoke_ca",
    "pl_revoke_sa",
    "pl_allow_self_reg",
    "pl_del_registration",
    "other_ch_commander",
    "other_ch_kick",
    "other_sv_kick",
    "other_text_pl",
    "other_text_all_ch",
    "other_text_in_ch",
    "other_text_all",
];

const CODEC_COLUMNS: &[&str] = &[
    "codec_celp51",
    "codec_celp63",
    "codec_gsm148",
    "codec_gsm164",
    "codec_celp52",
    "codec_speex2150",
    "codec_speex3950",
    "codec_speex5950",
    "codec_speex8000",
    "codec_speex11000",
    "codec_speex15000",
    "codec_speex18200",
    "codec_speex24600",
];

/// Server password used by every seeded test server.
pub const SERVER_PASSWORD: &str = "letmein";

/// A running parleyd with its scratch data directory.
pub struct TestServer {
    pub port: u16,
    child: Child,
    #[allow(dead_code)]
    data_dir: tempfile::TempDir,
}

impl TestServer {
    /// Seed a SQLite store, write a config file and spawn the daemon.
    /// The anonymous group gets every privilege so tests can exercise any
    /// operation without an admin login.
    pub async fn spawn(port: u16) -> anyhow::Result<TestServer> {
        let data_dir = tempfile::tempdir()?;
        let db_path = data_dir.path().join("parley.sqlite3");

        let pool = seeded_pool(&db_path, port).await?;
        pool.close().await;

        let config_path = data_dir.path().join("parleyd.toml");
        std::fs::write(
            &config_path,
            format!(
                "[db]\ntype = \"sqlite3\"\ndir = \"{}\"\ndb = \"parley.sqlite3\"\n\n[log]\noutput = \"stderr\"\nlevel = 1\n",
                data_dir.path().display()
            ),
        )?;

        let binary = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/parleyd");
        let child = Command::new(&binary)
            .arg("-c")
            .arg(&config_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        wait_until_bound(port).await?;
        Ok(TestServer {
            port,
            child,
            data_dir,
        })
    }

    /// Open the server's store, for assertions on persisted rows.
    pub async fn open_db(&self) -> anyhow::Result<SqlitePool> {
        let db_path = self.data_dir.path().join("parley.sqlite3");
        let options = SqliteConnectOptions::new().filename(&db_path);
        Ok(SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?)
    }
}

/// Wait for the daemon's socket. An unbound UDP port bounces our probe
/// with ICMP port-unreachable (seen as a refused recv on a connected
/// socket); once the server is up it swallows the garbage silently and the
/// recv just times out.
async fn wait_until_bound(port: u16) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    loop {
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await?;
        socket.connect(("127.0.0.1", port)).await?;
        let _ = socket.send(&[0u8; 2]).await;
        let mut buf = [0u8; 8];
        match tokio::time::timeout(std::time::Duration::from_millis(150), socket.recv(&mut buf))
            .await
        {
            // Timeout: nothing bounced, the port is served.
            Err(_) => return Ok(()),
            // A refused recv means the port is still closed; anything
            // else would be a real datagram, which the probe cannot get.
            Ok(_) => {
                if tokio::time::Instant::now() >= deadline {
                    anyhow::bail!("server did not bind port {port}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

async fn seeded_pool(db_path: &std::path::Path, port: u16) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    let codec_cols: Vec<String> = CODEC_COLUMNS
        .iter()
        .map(|c| format!("{c} INTEGER DEFAULT 0"))
        .collect();
    sqlx::query(&format!(
        "CREATE TABLE servers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            active INTEGER DEFAULT 1,
            name TEXT, welcome_msg TEXT, password TEXT, port INTEGER,
            {})",
        codec_cols.join(", ")
    ))
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE TABLE channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_id INTEGER, name TEXT, topic TEXT, description TEXT,
            codec INTEGER, maxusers INTEGER, ordr INTEGER,
            flag_default INTEGER, flag_hierarchical INTEGER, flag_moderated INTEGER,
            parent_id INTEGER, password TEXT)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE TABLE registrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_id INTEGER, serveradmin INTEGER, name TEXT, password TEXT)",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        "CREATE TABLE player_channel_privileges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER, channel_id INTEGER,
            channel_admin INTEGER, operator INTEGER, voice INTEGER,
            auto_operator INTEGER, auto_voice INTEGER)",
    )
    .execute(&pool)
    .await?;

    let privilege_cols: Vec<String> = PRIVILEGE_COLUMNS
        .iter()
        .map(|c| format!("{c} INTEGER DEFAULT 0"))
        .collect();
    sqlx::query(&format!(
        "CREATE TABLE server_privileges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_id INTEGER, user_group TEXT,
            {})",
        privilege_cols.join(", ")
    ))
    .execute(&pool)
    .await?;

    // One active server with every codec enabled.
    let codec_names = CODEC_COLUMNS.join(", ");
    let codec_ones = vec!["1"; CODEC_COLUMNS.len()].join(", ");
    sqlx::query(&format!(
        "INSERT INTO servers (active, name, welcome_msg, password, port, {codec_names})
         VALUES (1, 'Test Conference', 'Welcome to the test server.', '{SERVER_PASSWORD}', {port}, {codec_ones})"
    ))
    .execute(&pool)
    .await?;

    // A default channel with the SPEEX 12.3 codec.
    sqlx::query(
        "INSERT INTO channels
            (server_id, name, topic, description, codec, maxusers, ordr,
             flag_default, flag_hierarchical, flag_moderated, parent_id, password)
         VALUES (1, 'Lobby', 'general', 'talk here', 9, 16, 0, 1, 0, 0, -1, '')",
    )
    .execute(&pool)
    .await?;

    // Grant everything to the anonymous group.
    let privilege_names = PRIVILEGE_COLUMNS.join(", ");
    let privilege_ones = vec!["1"; PRIVILEGE_COLUMNS.len()].join(", ");
    sqlx::query(&format!(
        "INSERT INTO server_privileges (server_id, user_group, {privilege_names})
         VALUES (1, 'anonymous', {privilege_ones})"
    ))
    .execute(&pool)
    .await?;

    Ok(pool)
}
