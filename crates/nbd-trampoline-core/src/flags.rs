use std::collections::HashMap;

/// How a pass-through plugin flag takes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// `--name` or `--name=true`
    Boolean,
    /// `--name=value`, value mandatory
    Valued,
}

const PLUGIN_FLAGS: &[(&str, FlagKind)] = &[
    ("accessEC2IAM", FlagKind::Valued),
    ("accessFile", FlagKind::Valued),
    ("accessId", FlagKind::Valued),
    ("accessKey", FlagKind::Valued),
    ("accessType", FlagKind::Valued),
    ("authVersion", FlagKind::Valued),
    ("baseURL", FlagKind::Valued),
    ("blockCacheFile", FlagKind::Valued),
    ("blockCacheMaxDirty", FlagKind::Valued),
    ("blockCacheNoVerify", FlagKind::Boolean),
    ("blockCacheNumProtected", FlagKind::Valued),
    ("blockCacheRecoverDirtyBlocks", FlagKind::Boolean),
    ("blockCacheSize", FlagKind::Valued),
    ("blockCacheSync", FlagKind::Boolean),
    ("blockCacheThreads", FlagKind::Valued),
    ("blockCacheTimeout", FlagKind::Valued),
    ("blockCacheWriteDelay", FlagKind::Valued),
    ("blockHashPrefix", FlagKind::Boolean),
    ("blockSize", FlagKind::Valued),
    ("cacert", FlagKind::Valued),
    ("compress", FlagKind::Valued),
    ("debug", FlagKind::Boolean),
    ("debug-http", FlagKind::Boolean),
    ("defaultContentEncoding", FlagKind::Valued),
    ("directIO", FlagKind::Boolean),
    ("encrypt", FlagKind::Valued),
    ("filename", FlagKind::Valued),
    ("force", FlagKind::Boolean),
    ("initialRetryPause", FlagKind::Valued),
    ("insecure", FlagKind::Boolean),
    ("keyLength", FlagKind::Valued),
    ("listBlocks", FlagKind::Boolean),
    ("listBlocksThreads", FlagKind::Valued),
    ("maxDownloadSpeed", FlagKind::Valued),
    ("maxRetryPause", FlagKind::Valued),
    ("maxUploadSpeed", FlagKind::Valued),
    ("md5CacheSize", FlagKind::Valued),
    ("md5CacheTime", FlagKind::Valued),
    ("minWriteDelay", FlagKind::Valued),
    ("noAutoDetect", FlagKind::Boolean),
    ("password", FlagKind::Valued),
    ("passwordFile", FlagKind::Valued),
    ("prefix", FlagKind::Valued),
    ("quiet", FlagKind::Boolean),
    ("readAhead", FlagKind::Valued),
    ("readAheadTrigger", FlagKind::Valued),
    ("readOnly", FlagKind::Boolean),
    ("region", FlagKind::Valued),
    ("rrs", FlagKind::Boolean),
    ("size", FlagKind::Valued),
    ("sse", FlagKind::Valued),
    ("sse-key-id", FlagKind::Valued),
    ("ssl", FlagKind::Boolean),
    ("statsFilename", FlagKind::Valued),
    ("storageClass", FlagKind::Valued),
    ("timeout", FlagKind::Valued),
    ("vhost", FlagKind::Boolean),
];

/// Pass-through flags the plugin understands, keyed by name without the leading `--`
#[derive(Debug, Clone)]
pub struct FlagTable {
    kinds: HashMap<&'static str, FlagKind>,
}

impl FlagTable {
    pub fn plugin() -> Self {
        Self::from_entries(PLUGIN_FLAGS)
    }

    pub fn from_entries(entries: &[(&'static str, FlagKind)]) -> Self {
        Self {
            kinds: entries.iter().copied().collect(),
        }
    }

    pub fn kind(&self, name: &str) -> Option<FlagKind> {
        self.kinds.get(name).copied()
    }
}

impl Default for FlagTable {
    fn default() -> Self {
        Self::plugin()
    }
}
