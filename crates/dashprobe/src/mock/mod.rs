//! In-memory page driver.
//!
//! [`MockPage`] implements [`PageDriver`] over a flat, scriptable DOM. Pages
//! are built by routes, elements react to clicks and input through closures,
//! and deferred mutations model asynchronous UI updates that only show up
//! after the page has been observed a few times. Element matching uses
//! [`text_matches`], the same rules the browser-side resolver applies.
//!
//! ```
//! use dashprobe::mock::{MockElement, MockPage};
//!
//! let mut page = MockPage::blank("http://app/login");
//! page.dom_mut().push(MockElement::button("login", "Sign in"));
//! assert_eq!(page.dom_mut().elements().len(), 1);
//! ```

pub mod portal;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::driver::{ElementSnapshot, PageDriver};
use crate::locator::{text_matches, Locator, Selector};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::LoadState;

/// Mutation applied to the DOM by routes and element handlers
pub type Reaction = Arc<dyn Fn(&mut MockDom) + Send + Sync>;

type DeferredFn = Box<dyn FnOnce(&mut MockDom) + Send>;

/// A 1x1 transparent PNG returned by [`MockPage::screenshot`]
pub const BLANK_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f, 0x15, 0xc4,
    0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0xf8, 0x5f,
    0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

// =============================================================================
// ELEMENT
// =============================================================================

/// One element of the in-memory DOM
#[derive(Clone)]
pub struct MockElement {
    /// Identifier, matched by `#id` CSS selectors
    pub id: String,
    /// ARIA role
    pub role: Option<String>,
    /// Accessible name; falls back to label then text
    pub name: Option<String>,
    /// Associated label text
    pub label: Option<String>,
    /// Placeholder text
    pub placeholder: Option<String>,
    /// Visible text
    pub text: String,
    /// Current value; `Some` makes this a form field
    pub value: Option<String>,
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Rejects typed input
    pub read_only: bool,
    on_click: Option<Reaction>,
    on_input: Option<Reaction>,
}

impl std::fmt::Debug for MockElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockElement")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("text", &self.text)
            .field("value", &self.value)
            .field("visible", &self.visible)
            .field("enabled", &self.enabled)
            .field("on_click", &self.on_click.is_some())
            .finish_non_exhaustive()
    }
}

impl MockElement {
    /// Plain visible element
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
            name: None,
            label: None,
            placeholder: None,
            text: String::new(),
            value: None,
            visible: true,
            enabled: true,
            read_only: false,
            on_click: None,
            on_input: None,
        }
    }

    /// Empty text input
    #[must_use]
    pub fn input(id: impl Into<String>) -> Self {
        Self::new(id).role("textbox").value("")
    }

    /// Button with visible text
    #[must_use]
    pub fn button(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id).role("button").text(text)
    }

    /// Tab with visible text
    #[must_use]
    pub fn tab(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id).role("tab").text(text)
    }

    /// Set visible text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set ARIA role
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set accessible name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set placeholder
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set value (makes this a form field)
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Hide
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Disable
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Reject typed input
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Run `reaction` when clicked
    #[must_use]
    pub fn on_click(mut self, reaction: impl Fn(&mut MockDom) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(reaction));
        self
    }

    /// Run `reaction` after a value is written
    #[must_use]
    pub fn on_input(mut self, reaction: impl Fn(&mut MockDom) + Send + Sync + 'static) -> Self {
        self.on_input = Some(Arc::new(reaction));
        self
    }

    fn accessible_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or(&self.text)
    }

    fn matches(&self, locator: &Locator) -> bool {
        let exact = locator.is_exact();
        match locator.selector() {
            Selector::Text { text } => text_matches(&self.text, text, exact),
            Selector::Role { role, name } => {
                self.role.as_deref() == Some(role.as_str())
                    && name
                        .as_deref()
                        .map_or(true, |n| text_matches(self.accessible_name(), n, exact))
            }
            Selector::Label { label } => self
                .label
                .as_deref()
                .is_some_and(|l| text_matches(l, label, exact)),
            Selector::Placeholder { placeholder } => self
                .placeholder
                .as_deref()
                .is_some_and(|p| text_matches(p, placeholder, exact)),
            Selector::Css { css } => css.strip_prefix('#') == Some(self.id.as_str()),
        }
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            visible: self.visible,
            enabled: self.enabled,
            editable: self.value.is_some() && self.enabled && !self.read_only,
            value: self.value.clone(),
            text: crate::locator::normalize_whitespace(&self.text),
        }
    }
}

// =============================================================================
// DOM
// =============================================================================

struct Deferred {
    remaining: u32,
    apply: DeferredFn,
}

/// Document state shared by the page and its reactions
pub struct MockDom {
    url: String,
    ready_state: String,
    elements: Vec<MockElement>,
    deferred: Vec<Deferred>,
    routes: HashMap<String, Reaction>,
    unreachable: HashSet<String>,
    stalled: HashSet<String>,
    history: Vec<String>,
}

impl std::fmt::Debug for MockDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDom")
            .field("url", &self.url)
            .field("ready_state", &self.ready_state)
            .field("elements", &self.elements.len())
            .field("deferred", &self.deferred.len())
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

impl MockDom {
    /// Empty document at `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ready_state: "complete".to_string(),
            elements: Vec::new(),
            deferred: Vec::new(),
            routes: HashMap::new(),
            unreachable: HashSet::new(),
            stalled: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Register the page built when `url` is opened
    pub fn route(
        &mut self,
        url: impl Into<String>,
        build: impl Fn(&mut Self) + Send + Sync + 'static,
    ) -> &mut Self {
        let _ = self.routes.insert(url.into(), Arc::new(build));
        self
    }

    /// Make navigations to `url` fail as unreachable
    pub fn unreachable(&mut self, url: impl Into<String>) -> &mut Self {
        let _ = self.unreachable.insert(url.into());
        self
    }

    /// Make navigations to `url` never reach the load event
    pub fn stall(&mut self, url: impl Into<String>) -> &mut Self {
        let _ = self.stalled.insert(url.into());
        self
    }

    /// Replace the document with the page routed at `url`.
    ///
    /// Unrouted URLs load an empty document.
    pub fn open(&mut self, url: impl Into<String>) {
        let url = url.into();
        let route = self.routes.get(&url).cloned();
        self.elements.clear();
        self.deferred.clear();
        self.ready_state = "complete".to_string();
        self.history.push(url.clone());
        self.url = url;
        if let Some(build) = route {
            build(self);
        }
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the URL without reloading, like a history push
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Set `document.readyState`
    pub fn set_ready_state(&mut self, state: impl Into<String>) {
        self.ready_state = state.into();
    }

    /// Every URL opened so far
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Append an element
    pub fn push(&mut self, element: MockElement) {
        self.elements.push(element);
    }

    /// All elements in document order
    #[must_use]
    pub fn elements(&self) -> &[MockElement] {
        &self.elements
    }

    /// Look up an element by id
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&MockElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Look up an element by id for mutation
    pub fn element_mut(&mut self, id: &str) -> Option<&mut MockElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Current value of a form field
    #[must_use]
    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.value.as_deref())
    }

    /// Overwrite a field's value; unknown ids are ignored
    pub fn set_value(&mut self, id: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.value = Some(value.into());
        }
    }

    /// Show or hide an element; unknown ids are ignored
    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(el) = self.element_mut(id) {
            el.visible = visible;
        }
    }

    /// Keep only the elements for which `keep` returns true
    pub fn retain(&mut self, keep: impl FnMut(&MockElement) -> bool) {
        self.elements.retain(keep);
    }

    /// Apply `mutation` once the page has been observed `observations` more
    /// times. Zero applies it on the next observation.
    pub fn defer(&mut self, observations: u32, mutation: impl FnOnce(&mut Self) + Send + 'static) {
        self.deferred.push(Deferred {
            remaining: observations,
            apply: Box::new(mutation),
        });
    }

    fn tick(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .map(|mut d| {
                d.remaining = d.remaining.saturating_sub(1);
                d
            })
            .partition(|d| d.remaining == 0);
        self.deferred = pending;
        for d in due {
            (d.apply)(self);
        }
    }

    fn matching(&self, locator: &Locator) -> Vec<&MockElement> {
        self.elements.iter().filter(|e| e.matches(locator)).collect()
    }

    fn target(&self, locator: &Locator, index: usize) -> ProbeResult<MockElement> {
        self.matching(locator)
            .get(index)
            .map(|e| (*e).clone())
            .ok_or_else(|| ProbeError::Interaction {
                locator: locator.to_string(),
                message: "element detached".to_string(),
            })
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// [`PageDriver`] over a [`MockDom`]
#[derive(Debug)]
pub struct MockPage {
    dom: Mutex<MockDom>,
}

impl MockPage {
    /// Wrap a prepared document
    #[must_use]
    pub fn new(dom: MockDom) -> Self {
        Self {
            dom: Mutex::new(dom),
        }
    }

    /// Empty document at `url`
    #[must_use]
    pub fn blank(url: impl Into<String>) -> Self {
        Self::new(MockDom::new(url))
    }

    /// Mutable access to the document
    pub fn dom_mut(&mut self) -> &mut MockDom {
        self.dom.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every URL opened so far
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self) -> MutexGuard<'_, MockDom> {
        let mut dom = self.lock();
        dom.tick();
        dom
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&mut self, url: &str, wait_until: LoadState, timeout: Duration) -> ProbeResult<()> {
        let dom = self.dom_mut();
        if dom.unreachable.contains(url) {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            });
        }
        if dom.stalled.contains(url) {
            return Err(ProbeError::Timeout {
                what: format!("{wait_until} on {url}"),
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        tracing::debug!(url, "mock navigation");
        dom.open(url);
        if wait_until.is_reached_by(&dom.ready_state) {
            Ok(())
        } else {
            Err(ProbeError::Timeout {
                what: format!("{wait_until} on {url} (readyState {})", dom.ready_state),
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.observe().url.clone())
    }

    async fn ready_state(&self) -> ProbeResult<String> {
        Ok(self.observe().ready_state.clone())
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementSnapshot>> {
        let dom = self.observe();
        Ok(dom
            .matching(locator)
            .into_iter()
            .map(MockElement::snapshot)
            .collect())
    }

    async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> ProbeResult<()> {
        let dom = self.dom_mut();
        let target = dom.target(locator, index)?;
        if target.value.is_none() {
            return Err(ProbeError::Interaction {
                locator: locator.to_string(),
                message: "element is not a form field".to_string(),
            });
        }
        dom.set_value(&target.id, value);
        if let Some(reaction) = target.on_input {
            reaction(dom);
        }
        Ok(())
    }

    async fn click(&mut self, locator: &Locator, index: usize) -> ProbeResult<()> {
        let dom = self.dom_mut();
        let target = dom.target(locator, index)?;
        if let Some(reaction) = target.on_click {
            reaction(dom);
        }
        Ok(())
    }

    async fn screenshot(&mut self) -> ProbeResult<Vec<u8>> {
        Ok(BLANK_PNG.to_vec())
    }
}
