//! Injection guards for values that end up in SOQL, URLs and SOAP bodies.
//!
//! Entity and field names arrive from request paths and describe payloads,
//! so every one of them passes through these checks before being placed in a
//! query or URL.

/// SOQL identifier checks.
pub mod soql {
    /// Check that a name is a plain API identifier (`Name`, `Custom_Field__c`).
    ///
    /// ```rust
    /// use busbar_sf_client::security::soql;
    ///
    /// assert!(soql::is_safe_field_name("Custom_Field__c"));
    /// assert!(!soql::is_safe_field_name("Bad'; DROP TABLE--"));
    /// ```
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            }
            _ => false,
        }
    }

    /// SObject names follow the same rules as field names.
    #[must_use]
    pub fn is_safe_sobject_name(name: &str) -> bool {
        is_safe_field_name(name)
    }

    /// Return the first unsafe name in `fields`, if any.
    pub fn first_unsafe_field<'a, S: AsRef<str>>(fields: &'a [S]) -> Option<&'a str> {
        fields
            .iter()
            .map(AsRef::as_ref)
            .find(|field| !is_safe_field_name(field))
    }
}

/// URL path segment encoding.
pub mod url {
    /// Percent-encode a value used as a single path segment.
    ///
    /// ```rust
    /// use busbar_sf_client::security::url;
    ///
    /// assert_eq!(url::encode_param("750/../x"), "750%2F..%2Fx");
    /// ```
    pub fn encode_param(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }
}

/// XML escaping for SOAP bodies.
pub mod xml {
    /// Escape a string for safe inclusion in XML content.
    ///
    /// ```rust
    /// use busbar_sf_client::security::xml;
    ///
    /// assert_eq!(xml::escape("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
    /// ```
    #[must_use]
    pub fn escape(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 16);
        for ch in value.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&apos;"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }
}
