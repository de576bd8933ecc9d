//! Shared test fixtures for auth/session test modules.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sign-in page as served after cookie priming.
pub const SIGNIN_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>GARMIN Authentication Application</title></head>
<body>
<form method="post" id="login-form">
  <input type="email" name="username" />
  <input type="password" name="password" />
  <input type="hidden" name="embed" value="true"/>
  <input type="hidden" name="_csrf" value="2A0F6E1C-CSRF-SIGNIN" />
</form>
</body>
</html>"#;

/// MFA challenge page returned instead of the success page.
pub const MFA_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Enter MFA code for login</title></head>
<body>
<form method="post" id="mfa-form">
  <input type="text" name="mfa-code" />
  <input type="hidden" name="_csrf" value="7B11-CSRF-MFA" />
</form>
</body>
</html>"#;

/// Success page carrying `ticket` in its redirect script.
pub fn success_html(ticket: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Success</title>
<script type="text/javascript">
  var redirectAfterAccountLoginUrl = "https:\/\/sso.garmin.com\/sso\/embed";
  var response_url = "https:\/\/sso.garmin.com\/sso\/embed?ticket={ticket}";
</script>
</head>
<body></body>
</html>"#
    )
}

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("gconnect-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn child(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
