//! Fixed pages served to the browser tab after the redirect.
//!
//! Neither page interpolates request data.

/// Shown when the redirect carried an authorization code.
pub const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sign-in complete</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 4rem auto; max-width: 32rem; text-align: center; color: #1f2933; }
  h1 { font-size: 1.5rem; }
  p { color: #52606d; }
</style>
</head>
<body>
<h1>Sign-in complete</h1>
<p>You can close this tab and return to the application.</p>
<script>setTimeout(function () { window.close(); }, 3000);</script>
</body>
</html>
"#;

/// Shown when the provider redirected with an error.
pub const ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Sign-in failed</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 4rem auto; max-width: 32rem; text-align: center; color: #1f2933; }
  h1 { font-size: 1.5rem; color: #ab091e; }
  p { color: #52606d; }
</style>
</head>
<body>
<h1>Sign-in failed</h1>
<p>The sign-in was cancelled or could not be completed. Return to the application to try again.</p>
</body>
</html>
"#;
