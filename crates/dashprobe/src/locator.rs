//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a deferred description of how to find an element: by
//! visible text, ARIA role and accessible name, label, placeholder or CSS.
//! Nothing is resolved when a locator is built; every step that uses it
//! re-evaluates it against the live page.
//!
//! # Matching rules
//!
//! - Whitespace is collapsed and trimmed on both sides before comparing.
//! - Matching is a case-insensitive substring match unless the locator is
//!   [`exact`](Locator::exact).
//! - Locators are strict: a step fails when more than one element matches,
//!   unless [`first`](Locator::first) or [`nth`](Locator::nth) picks one.
//!
//! The browser-side resolver in [`RESOLVER_JS`] applies the same rules as
//! [`text_matches`], so the in-memory driver and Chromium agree.

use serde::{Deserialize, Serialize};

use crate::result::ProbeResult;

/// Selector kinds understood by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// Element whose visible text contains the string
    Text {
        /// Text to match
        text: String,
    },
    /// Element with an ARIA role (explicit or implicit) and accessible name
    Role {
        /// ARIA role, e.g. `button` or `tab`
        role: String,
        /// Accessible name to match
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Form control associated with a `<label>` or `aria-label`
    Label {
        /// Label text to match
        label: String,
    },
    /// Input whose placeholder contains the string
    Placeholder {
        /// Placeholder text to match
        placeholder: String,
    },
    /// Raw CSS selector
    Css {
        /// CSS selector
        css: String,
    },
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text { text } => write!(f, "text {text:?}"),
            Self::Role { role, name: None } => write!(f, "role {role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role {role} named {name:?}"),
            Self::Label { label } => write!(f, "label {label:?}"),
            Self::Placeholder { placeholder } => write!(f, "placeholder {placeholder:?}"),
            Self::Css { css } => write!(f, "css {css:?}"),
        }
    }
}

/// A deferred, re-evaluated query for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    selector: Selector,
    /// Require whole-string, case-sensitive matches
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    exact: bool,
    /// Pick the n-th match instead of requiring a unique one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nth: Option<usize>,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            exact: false,
            nth: None,
        }
    }

    /// Locate by visible text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::Text { text: text.into() })
    }

    /// Locate by ARIA role and accessible name
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: Some(name.into()),
        })
    }

    /// Locate by associated label text
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::from_selector(Selector::Label {
            label: label.into(),
        })
    }

    /// Locate by placeholder text
    #[must_use]
    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self::from_selector(Selector::Placeholder {
            placeholder: placeholder.into(),
        })
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { css: css.into() })
    }

    /// Require exact matches
    #[must_use]
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Pick the first match
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Pick the n-th match (zero based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Whether exact matching is on
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    /// Index picked by `first`/`nth`, if any
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.nth
    }

    /// Whether more than one match is an error
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.nth.is_none()
    }

    /// Apply a string rewrite to every text field (used for `${VAR}` expansion)
    pub fn map_strings<E>(
        &self,
        mut f: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<Self, E> {
        let selector = match &self.selector {
            Selector::Text { text } => Selector::Text { text: f(text)? },
            Selector::Role { role, name } => Selector::Role {
                role: f(role)?,
                name: name.as_deref().map(&mut f).transpose()?,
            },
            Selector::Label { label } => Selector::Label { label: f(label)? },
            Selector::Placeholder { placeholder } => Selector::Placeholder {
                placeholder: f(placeholder)?,
            },
            Selector::Css { css } => Selector::Css { css: f(css)? },
        };
        Ok(Self {
            selector,
            exact: self.exact,
            nth: self.nth,
        })
    }

    /// JSON query handed to the browser-side resolver
    fn resolver_query(&self) -> ProbeResult<String> {
        let mut query = serde_json::to_value(&self.selector)?;
        if let Some(obj) = query.as_object_mut() {
            obj.insert("exact".to_string(), serde_json::Value::Bool(self.exact));
        }
        Ok(serde_json::to_string(&query)?)
    }

    /// JavaScript expression returning a JSON array of element snapshots
    pub fn to_query_script(&self) -> ProbeResult<String> {
        let query = self.resolver_query()?;
        Ok(format!(
            "(() => {{ const resolve = {RESOLVER_JS}; const snap = {SNAPSHOT_JS}; \
             return JSON.stringify(resolve({query}).map(snap)); }})()"
        ))
    }

    /// JavaScript expression that writes `value` into the `index`-th match.
    ///
    /// Evaluates to `"ok"` or an error message.
    pub fn to_fill_script(&self, index: usize, value: &str) -> ProbeResult<String> {
        let query = self.resolver_query()?;
        let value = serde_json::to_string(value)?;
        Ok(format!(
            "(() => {{ const resolve = {RESOLVER_JS}; const fill = {FILL_JS}; \
             return fill(resolve({query})[{index}], {value}); }})()"
        ))
    }

    /// JavaScript expression that activates the `index`-th match.
    ///
    /// Evaluates to `"ok"` or an error message.
    pub fn to_click_script(&self, index: usize) -> ProbeResult<String> {
        let query = self.resolver_query()?;
        Ok(format!(
            "(() => {{ const resolve = {RESOLVER_JS}; const click = {CLICK_JS}; \
             return click(resolve({query})[{index}]); }})()"
        ))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector)?;
        if self.exact {
            write!(f, " (exact)")?;
        }
        if let Some(n) = self.nth {
            write!(f, " [#{n}]")?;
        }
        Ok(())
    }
}

/// Collapse runs of whitespace and trim
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compare text the way the resolver does
#[must_use]
pub fn text_matches(haystack: &str, needle: &str, exact: bool) -> bool {
    let haystack = normalize_whitespace(haystack);
    let needle = normalize_whitespace(needle);
    if exact {
        haystack == needle
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Browser-side resolver: `(query) => Element[]` in document order.
pub const RESOLVER_JS: &str = r#"(query) => {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (hay, needle) => {
    const h = norm(hay), n = norm(needle);
    return query.exact ? h === n : h.toLowerCase().includes(n.toLowerCase());
  };
  const implicit = {
    button: 'button,input[type=button],input[type=submit],input[type=reset]',
    link: 'a[href]',
    textbox: 'input:not([type]),input[type=text],input[type=email],input[type=password],input[type=search],input[type=tel],input[type=url],textarea',
    checkbox: 'input[type=checkbox]',
    heading: 'h1,h2,h3,h4,h5,h6',
  };
  const all = (sel) => Array.from(document.querySelectorAll(sel));
  const byId = (id) => document.getElementById(id);
  const accName = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria) return aria;
    const ids = (el.getAttribute('aria-labelledby') || '').split(/\s+/).filter(Boolean);
    const labelled = ids.map((id) => (byId(id) ? byId(id).textContent : '')).join(' ');
    if (norm(labelled)) return labelled;
    return el.textContent || el.value || el.getAttribute('title') || '';
  };
  const inDocOrder = (els) => Array.from(new Set(els)).sort((a, b) =>
    a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1);
  switch (query.by) {
    case 'text': {
      const hits = all('body *').filter((el) =>
        !['SCRIPT', 'STYLE', 'NOSCRIPT'].includes(el.tagName) && matches(el.textContent, query.text));
      return hits.filter((el) => !hits.some((o) => o !== el && el.contains(o)));
    }
    case 'role': {
      const sel = '[role="' + query.role + '"]' + (implicit[query.role] ? ',' + implicit[query.role] : '');
      return all(sel).filter((el) => {
        const explicit = el.getAttribute('role');
        return (!explicit || explicit === query.role) && (query.name == null || matches(accName(el), query.name));
      });
    }
    case 'label': {
      const viaLabel = all('label').filter((l) => matches(l.textContent, query.label))
        .map((l) => l.control || (l.htmlFor ? byId(l.htmlFor) : null)).filter(Boolean);
      const viaAria = all('[aria-label]').filter((el) => matches(el.getAttribute('aria-label'), query.label));
      return inDocOrder(viaLabel.concat(viaAria));
    }
    case 'placeholder':
      return all('[placeholder]').filter((el) => matches(el.getAttribute('placeholder'), query.placeholder));
    default:
      return all(query.css);
  }
}"#;

/// Browser-side snapshot of one element's observable state
const SNAPSHOT_JS: &str = r"(el) => {
  const rect = el.getBoundingClientRect();
  const style = getComputedStyle(el);
  const visible = rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';
  const isField = ['INPUT', 'TEXTAREA', 'SELECT'].includes(el.tagName);
  const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true';
  const editable = (isField || el.isContentEditable) && enabled && !el.readOnly;
  return {
    visible,
    enabled,
    editable,
    value: isField ? String(el.value) : null,
    text: (el.innerText || el.textContent || '').replace(/\s+/g, ' ').trim(),
  };
}";

/// Browser-side value writer that React-controlled inputs observe
const FILL_JS: &str = r"(el, value) => {
  if (!el) return 'element detached';
  const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const desc = Object.getOwnPropertyDescriptor(proto, 'value');
  el.focus();
  if (desc && desc.set) { desc.set.call(el, value); } else { el.value = value; }
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return 'ok';
}";

/// Browser-side synthetic activation
const CLICK_JS: &str = r"(el) => {
  if (!el) return 'element detached';
  el.scrollIntoView({ block: 'center', inline: 'center' });
  for (const type of ['pointerdown', 'mousedown', 'pointerup', 'mouseup']) {
    const Ctor = type.startsWith('pointer') && window.PointerEvent ? PointerEvent : MouseEvent;
    el.dispatchEvent(new Ctor(type, { bubbles: true, cancelable: true, view: window }));
  }
  if (typeof el.focus === 'function') el.focus();
  el.click();
  return 'ok';
}";
