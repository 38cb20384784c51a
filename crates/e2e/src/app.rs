//! App definitions: package manifest, `app.yaml` and source files

use serde_json::{json, Map, Value};

use crate::error::{E2eError, E2eResult};
use crate::fs_tree::{DirEntry, DirectoryTree};

pub const APP_CONFIG_FILE: &str = "app.yaml";
pub const PACKAGE_MANIFEST_FILE: &str = "wasmer.toml";

const APP_KIND: &str = "wasmer.io/App.v0";

const DEFAULT_JS_WORKER: &str = r#"
async function handler(request) {
  const out = JSON.stringify({
    env: process.env,
    headers: Object.fromEntries(request.headers),
  }, null, 2);
  return new Response(out, {
    headers: { "content-type": "application/json" },
  });
}

addEventListener("fetch", (fetchEvent) => {
  fetchEvent.respondWith(handler(fetchEvent.request));
});
"#;

/// A random app name: `t-` followed by 20 hex characters
pub fn random_app_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("t-{}", &id[..20])
}

/// Everything needed to deploy an app
#[derive(Debug, Clone, Default)]
pub struct AppDefinition {
    /// Package manifest, written as `wasmer.toml` when present
    pub package_manifest: Option<Map<String, Value>>,

    /// App configuration, written as `app.yaml`
    pub app_config: Map<String, Value>,

    /// Source files
    pub files: DirectoryTree,
}

fn object(value: Value) -> E2eResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(E2eError::InvalidAppConfig(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

impl AppDefinition {
    /// Build a definition from JSON values; both must be objects
    pub fn from_json(
        package_manifest: Option<Value>,
        app_config: Value,
        files: DirectoryTree,
    ) -> E2eResult<Self> {
        Ok(Self {
            package_manifest: package_manifest.map(object).transpose()?,
            app_config: object(app_config)?,
            files,
        })
    }

    /// Static site served by `wasmer/static-web-server` from `public/`
    pub fn static_site() -> Self {
        Self::from_parts(
            json!({
                "dependencies": { "wasmer/static-web-server": "1" },
                "fs": { "/public": "public" },
                "command": [{
                    "name": "script",
                    "module": "wasmer/static-web-server:webserver",
                    "runner": "https://webc.org/runner/wasi",
                }],
            }),
            DirectoryTree::new().dir(
                "public",
                DirectoryTree::new().file("index.html", "<html><body>Hello!</body></html>"),
            ),
        )
    }

    /// JavaScript worker running on `wasmer/winterjs`.
    ///
    /// Without code, the worker echoes its environment and request headers
    /// as JSON.
    pub fn js_worker(code: Option<&str>) -> Self {
        Self::from_parts(
            json!({
                "dependencies": { "wasmer/winterjs": "1" },
                "fs": { "/src": "src" },
                "command": [{
                    "name": "script",
                    "module": "wasmer/winterjs:winterjs",
                    "runner": "https://webc.org/runner/wasi",
                    "annotations": {
                        "wasi": { "main-args": ["/src/index.js"] },
                    },
                }],
            }),
            DirectoryTree::new().dir(
                "src",
                DirectoryTree::new().file("index.js", code.unwrap_or(DEFAULT_JS_WORKER)),
            ),
        )
    }

    /// PHP app served by the built-in PHP server from `src/`
    pub fn php(index_php: &str) -> Self {
        Self::from_parts(
            json!({
                "dependencies": { "php/php": "8.*" },
                "fs": { "/src": "src" },
                "command": [{
                    "name": "run",
                    "module": "php/php:php",
                    "runner": "wasi",
                    "annotations": {
                        "wasi": { "main-args": ["-t", "/src", "-S", "localhost:8080"] },
                    },
                }],
            }),
            DirectoryTree::new().dir("src", DirectoryTree::new().file("index.php", index_php)),
        )
    }

    fn from_parts(manifest: Value, files: DirectoryTree) -> Self {
        let mut app_config = Map::new();
        app_config.insert("kind".to_string(), json!(APP_KIND));
        app_config.insert("package".to_string(), json!("."));
        Self {
            package_manifest: match manifest {
                Value::Object(map) => Some(map),
                _ => None,
            },
            app_config,
            files,
        }
    }

    /// Request a MySQL database; credentials reach the app as `DB_*` env vars
    pub fn with_mysql(mut self) -> Self {
        self.app_config.insert(
            "capabilities".to_string(),
            json!({ "database": { "engine": "mysql" } }),
        );
        self.app_config
            .insert("scaling".to_string(), json!({ "mode": "single_concurrency" }));
        self
    }

    /// Set a top-level `app.yaml` field
    pub fn with_config(mut self, key: &str, value: Value) -> Self {
        self.app_config.insert(key.to_string(), value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.app_config.get("name").and_then(Value::as_str)
    }

    /// Fill in owner, name and domains where the caller left them unset
    pub fn fill_defaults(&mut self, namespace: &str, app_domain: &str) {
        let unset = |config: &Map<String, Value>, key: &str| {
            config.get(key).map(Value::is_null).unwrap_or(true)
        };

        if unset(&self.app_config, "owner") {
            self.app_config.insert("owner".to_string(), json!(namespace));
        }
        if unset(&self.app_config, "name") {
            self.app_config
                .insert("name".to_string(), json!(random_app_name()));
        }
        if unset(&self.app_config, "domains") {
            let name = self
                .app_config
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(random_app_name);
            self.app_config.insert(
                "domains".to_string(),
                json!([format!("{}.{}", name, app_domain)]),
            );
        }
    }

    /// The full file tree to deploy: sources plus serialized config files
    pub fn to_tree(&self) -> E2eResult<DirectoryTree> {
        let mut tree = self.files.clone();
        tree.insert(
            APP_CONFIG_FILE,
            DirEntry::File(serde_yaml::to_string(&self.app_config)?),
        );
        if let Some(manifest) = &self.package_manifest {
            tree.insert(
                PACKAGE_MANIFEST_FILE,
                DirEntry::File(toml::to_string(manifest)?),
            );
        }
        Ok(tree)
    }
}
