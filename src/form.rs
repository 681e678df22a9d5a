use crate::auth::TOKEN_HEADER;
use crate::config::Config;
use crate::request::IMAGE_FIELD;

const FORM_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>WebDAV Image Uploader</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 2em auto; padding: 0 1em; }
        form { margin: 2em 0; }
        .error { color: red; }
        .success { color: green; }
        .token-input { margin-bottom: 1em; }
    </style>
</head>
<body>
    <h1>Image Uploader</h1>
    <form method="POST" enctype="multipart/form-data">
"#;

const FORM_TOKEN: &str = r#"        <div class="token-input">
            <label for="token">Upload Token:</label>
            <input type="password" id="token" required>
        </div>
"#;

/// Render the upload page.
///
/// The token input is only shown if uploads require a token.
pub fn render_form(config: &Config) -> String {
    let accept: Vec<&str> = config.types.mimes().map(|v| v.essence_str()).collect();
    let mut s = String::from(FORM_HEAD);
    if config.token_required() {
        s.push_str(FORM_TOKEN);
    }
    s.push_str(&format!(
        r#"        <input type="file" name="{}" accept="{}" required>
        <button type="submit">Upload</button>
    </form>
    <div id="result"></div>
    <script>
    document.querySelector('form').addEventListener('submit', async (e) => {{
        e.preventDefault();
        const formData = new FormData(e.target);
        const resultDiv = document.getElementById('result');
        try {{
            const token = document.getElementById('token')?.value;
            const response = await fetch('', {{
                method: 'POST',
                body: formData,
                headers: token ? {{ '{}': token }} : {{}}
            }});
            const result = await response.json();
            if (result.error) {{
                resultDiv.className = 'error';
                resultDiv.textContent = `Error: ${{result.error}}`;
            }} else {{
                resultDiv.className = 'success';
                resultDiv.innerHTML = `
                    Upload successful!<br>
                    URL: <a href="${{result.url}}" target="_blank">${{result.url}}</a><br>
                    Hash: ${{result.hash}}<br>
                    Size: ${{(result.size / 1024).toFixed(2)}}KB
                `;
            }}
        }} catch (err) {{
            resultDiv.className = 'error';
            resultDiv.textContent = `Error: ${{err.message}}`;
        }}
    }});
    </script>
</body>
</html>
"#,
        IMAGE_FIELD,
        accept.join(","),
        TOKEN_HEADER,
    ));
    s
}

#[cfg(test)]
mod tests {
    use super::render_form;
    use crate::classify::TypeTable;
    use crate::config::Config;

    #[test]
    fn test_form_open() {
        let cfg = Config::new("http://localhost", "", "").unwrap()
            .with_types(TypeTable::with_extensions(&["jpg", "png"]).unwrap());
        let s = render_form(&cfg);
        assert!(s.contains(r#"name="image""#));
        assert!(s.contains(r#"accept="image/jpeg,image/png""#));
        assert!(!s.contains(r#"id="token""#));
    }

    #[test]
    fn test_form_token() {
        let cfg = Config::new("http://localhost", "", "").unwrap()
            .with_tokens(vec!(String::from("zq-secret-71")));
        let s = render_form(&cfg);
        assert!(s.contains(r#"id="token""#));
        assert!(s.contains("'X-Upload-Token': token"));
        assert!(!s.contains("zq-secret-71"));
    }
}
