use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Mobile WebView user agents handed out to new sessions.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
    "Mozilla/5.0 (Linux; Android 14; SM-S918B Build/UP1A.231005.007; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/127.0.6533.103 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7 Build/TQ3A.230901.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/127.0.6533.64 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; 23078PND5G Build/UKQ1.230804.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/126.0.6478.134 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 12; SM-A525F Build/SP1A.210812.016; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/127.0.6533.103 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; CPH2451 Build/TP1A.220905.001; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/126.0.6478.122 Mobile Safari/537.36",
];

/// Platform hint derived from a user agent: `ios`, `android` or `Unknown`.
pub fn platform_for(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("iphone") || ua.contains("ipad") {
        "ios"
    } else if ua.contains("android") {
        "android"
    } else {
        "Unknown"
    }
}

/// The browser identity an account presents on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub user_agent: String,
    pub platform: &'static str,
}

impl DeviceProfile {
    pub fn new(user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let platform = platform_for(&user_agent);
        Self {
            user_agent,
            platform,
        }
    }

    pub fn sec_ch_ua(&self) -> String {
        format!(
            "\"Not)A;Brand\";v=\"99\", \"{} WebView\";v=\"127\", \"Chromium\";v=\"127\"",
            self.platform
        )
    }
}

/// File-backed map of session key to user agent.
///
/// Entries are only ever added; an assigned user agent is never replaced.
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Reads the cache file. A missing file starts an empty cache; a corrupt
    /// one is an error so it never gets silently overwritten.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Invalid fingerprint cache {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, session_key: &str) -> Option<&str> {
        self.entries.get(session_key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stored user agent, assigning a random one first if the key
    /// is new. The flag is true when an assignment happened.
    pub fn get_or_assign<R: Rng + ?Sized>(
        &mut self,
        session_key: &str,
        rng: &mut R,
    ) -> (String, bool) {
        if let Some(existing) = self.entries.get(session_key) {
            return (existing.clone(), false);
        }
        let user_agent = USER_AGENTS
            .choose(rng)
            .copied()
            .unwrap_or(USER_AGENTS[0])
            .to_string();
        self.entries.insert(session_key.to_string(), user_agent.clone());
        (user_agent, true)
    }

    /// Writes the whole map through a temp file so a crash never leaves a
    /// truncated cache behind.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

enum Command {
    Resolve {
        session_key: String,
        reply: oneshot::Sender<String>,
    },
}

/// Handle to the task that owns the [`FingerprintStore`]. Cloning is cheap;
/// every clone talks to the same single writer.
#[derive(Clone)]
pub struct FingerprintService {
    tx: mpsc::Sender<Command>,
}

impl FingerprintService {
    pub fn spawn(mut store: FingerprintStore) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(64);

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Resolve { session_key, reply } => {
                        let (user_agent, created) =
                            store.get_or_assign(&session_key, &mut rand::thread_rng());
                        if created {
                            info!("Creating user agent for {}", session_key);
                            if let Err(e) = store.save() {
                                warn!("Failed to persist user agents: {:#}", e);
                            }
                        }
                        let _ = reply.send(user_agent);
                    }
                }
            }
            debug!("Fingerprint service stopped ({} entries)", store.len());
        });

        Self { tx }
    }

    pub async fn resolve(&self, session_key: &str) -> Result<DeviceProfile> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Resolve {
                session_key: session_key.to_string(),
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Fingerprint service is not running"))?;
        let user_agent = rx
            .await
            .context("Fingerprint service dropped the request")?;
        Ok(DeviceProfile::new(user_agent))
    }
}
