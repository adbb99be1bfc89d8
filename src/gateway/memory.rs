//! In-memory page model implementing [`LocatorGateway`]
//!
//! Pages are trees of nodes addressed by the locator that finds them. Paginated
//! tables expose a window of `page_size` rows at a time and advance either
//! through a "next page" button or through numbered page buttons, the two
//! paging controls the tender site uses. Waits never sleep: an element is
//! either resolvable right now or the wait times out immediately.
//!
//! The gateway records what the crawler did (navigations, waits, typed text,
//! page advances) so callers can assert on it, and can be told to fail
//! navigation to a URL a number of times.

use crate::gateway::{GatewayError, GatewayResult, Locator, LocatorGateway};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type NodeId = usize;

/// A node description used to build pages
#[derive(Debug, Clone, Default)]
pub struct MemoryNode {
    text: String,
    attrs: Vec<(String, String)>,
    children: Vec<(Locator, MemoryNode)>,
    on_click: Option<(String, String)>,
}

impl MemoryNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Adds a descendant reachable from this node through `locator`
    pub fn child(mut self, locator: &Locator, node: MemoryNode) -> Self {
        self.children.push((locator.clone(), node));
        self
    }

    /// Clicking this node sets attribute `name` to `value`
    pub fn on_click_set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.on_click = Some((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
enum Paging {
    NextButton(Locator),
    PageButtons(Locator),
}

/// A paginated table description used to build pages
#[derive(Debug, Clone)]
pub struct MemoryTable {
    row: Locator,
    page_size: usize,
    rows: Vec<MemoryNode>,
    paging: Option<Paging>,
}

impl MemoryTable {
    /// `row` is a template with a `{row}` placeholder, 1-based within the page window
    pub fn new(row: Locator, page_size: usize) -> Self {
        Self {
            row,
            page_size: page_size.max(1),
            rows: Vec::new(),
            paging: None,
        }
    }

    /// Pages advance through a single button that is disabled on the last page
    pub fn next_button(mut self, locator: Locator) -> Self {
        self.paging = Some(Paging::NextButton(locator));
        self
    }

    /// Pages advance through numbered buttons; `template` has a `{page}` placeholder
    pub fn page_buttons(mut self, template: Locator) -> Self {
        self.paging = Some(Paging::PageButtons(template));
        self
    }

    pub fn row(mut self, node: MemoryNode) -> Self {
        self.rows.push(node);
        self
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    text: String,
    attrs: HashMap<String, String>,
    children: Vec<(Locator, NodeId)>,
    on_click: Option<(String, String)>,
}

#[derive(Debug, Clone)]
struct LiveTable {
    row: Locator,
    page_size: usize,
    rows: Vec<NodeId>,
    paging: Option<Paging>,
    current_page: usize,
}

impl LiveTable {
    fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.page_size).max(1)
    }

    fn on_last_page(&self) -> bool {
        self.current_page + 1 >= self.page_count()
    }
}

/// A page served by [`MemoryGateway`]
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    nodes: Vec<NodeData>,
    roots: Vec<(Locator, NodeId)>,
    tables: Vec<LiveTable>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node reachable from the document root through `locator`
    pub fn insert(&mut self, locator: &Locator, node: MemoryNode) -> &mut Self {
        let id = self.flatten(node);
        self.roots.push((locator.clone(), id));
        self
    }

    pub fn add_table(&mut self, table: MemoryTable) -> &mut Self {
        let rows = table
            .rows
            .into_iter()
            .map(|node| self.flatten(node))
            .collect();
        self.tables.push(LiveTable {
            row: table.row,
            page_size: table.page_size,
            rows,
            paging: table.paging,
            current_page: 0,
        });
        self
    }

    fn flatten(&mut self, node: MemoryNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            text: node.text,
            attrs: node.attrs.into_iter().collect(),
            children: Vec::new(),
            on_click: node.on_click,
        });
        for (locator, child) in node.children {
            let child_id = self.flatten(child);
            self.nodes[id].children.push((locator, child_id));
        }
        id
    }

    fn resolve(&self, locator: &Locator) -> Option<MemoryElement> {
        for (index, table) in self.tables.iter().enumerate() {
            for slot in 1..=table.page_size {
                if table.row.fill("row", slot) == *locator {
                    let position = table.current_page * table.page_size + slot - 1;
                    return table.rows.get(position).copied().map(MemoryElement::Node);
                }
            }
            match &table.paging {
                Some(Paging::NextButton(button)) if button == locator => {
                    return Some(MemoryElement::NextButton(index));
                }
                Some(Paging::PageButtons(template)) => {
                    for page in 1..=table.page_count() {
                        if template.fill("page", page) == *locator {
                            return Some(MemoryElement::PageButton(index, page));
                        }
                    }
                }
                _ => {}
            }
        }

        self.roots
            .iter()
            .find(|(key, _)| key == locator)
            .map(|(_, id)| MemoryElement::Node(*id))
    }

    fn node(&self, id: NodeId) -> GatewayResult<&NodeData> {
        self.nodes
            .get(id)
            .ok_or_else(|| GatewayError::StaleElement(format!("node {}", id)))
    }

    fn table(&self, index: usize) -> GatewayResult<&LiveTable> {
        self.tables
            .get(index)
            .ok_or_else(|| GatewayError::StaleElement(format!("table {}", index)))
    }
}

/// Element handle of a [`MemoryGateway`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryElement {
    Node(NodeId),
    NextButton(usize),
    PageButton(usize, usize),
}

#[derive(Debug, Default)]
struct GatewayState {
    pages: HashMap<String, MemoryPage>,
    current: Option<MemoryPage>,
    navigation_failures: HashMap<String, usize>,
    advance_failures: usize,
    navigations: Vec<String>,
    waits: Vec<Locator>,
    typed: Vec<String>,
    advance_clicks: usize,
    scrolls: usize,
    closed: bool,
}

impl GatewayState {
    fn page(&self) -> GatewayResult<&MemoryPage> {
        self.current
            .as_ref()
            .ok_or_else(|| GatewayError::Session("no page loaded".to_string()))
    }

    fn page_mut(&mut self) -> GatewayResult<&mut MemoryPage> {
        self.current
            .as_mut()
            .ok_or_else(|| GatewayError::Session("no page loaded".to_string()))
    }
}

/// In-memory gateway over registered [`MemoryPage`]s
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<GatewayState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the page served for `url`; every navigation gets a fresh copy
    pub fn add_page(&self, url: impl Into<String>, page: MemoryPage) {
        self.lock().pages.insert(url.into(), page);
    }

    /// Makes the next `times` navigations to `url` fail
    pub fn fail_navigation(&self, url: impl Into<String>, times: usize) {
        self.lock().navigation_failures.insert(url.into(), times);
    }

    /// Makes the next `times` clicks on a paging control fail
    pub fn fail_advance_clicks(&self, times: usize) {
        self.lock().advance_failures = times;
    }

    /// URLs navigated to, including failed attempts
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Every locator waited for, in order
    pub fn waits(&self) -> Vec<Locator> {
        self.lock().waits.clone()
    }

    pub fn waited_for(&self, locator: &Locator) -> bool {
        self.lock().waits.iter().any(|waited| waited == locator)
    }

    /// Text typed into inputs, in order
    pub fn typed_text(&self) -> Vec<String> {
        self.lock().typed.clone()
    }

    /// Number of clicks that moved a table to another page
    pub fn advance_clicks(&self) -> usize {
        self.lock().advance_clicks
    }

    pub fn scrolls(&self) -> usize {
        self.lock().scrolls
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl LocatorGateway for MemoryGateway {
    type Element = MemoryElement;

    async fn navigate(&self, url: &str) -> GatewayResult<()> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());

        if let Some(remaining) = state.navigation_failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GatewayError::Navigation {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
        }

        let page = state
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| GatewayError::Navigation {
                url: url.to_string(),
                message: "no page registered".to_string(),
            })?;
        state.current = Some(page);
        Ok(())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> GatewayResult<Option<MemoryElement>> {
        let mut state = self.lock();
        state.waits.push(locator.clone());
        Ok(state.page()?.resolve(locator))
    }

    async fn find_within(
        &self,
        scope: &MemoryElement,
        locator: &Locator,
    ) -> GatewayResult<Option<MemoryElement>> {
        Ok(self
            .find_all_within(scope, locator)
            .await?
            .into_iter()
            .next())
    }

    async fn find_all_within(
        &self,
        scope: &MemoryElement,
        locator: &Locator,
    ) -> GatewayResult<Vec<MemoryElement>> {
        let state = self.lock();
        let page = state.page()?;
        match scope {
            MemoryElement::Node(id) => Ok(page
                .node(*id)?
                .children
                .iter()
                .filter(|(key, _)| key == locator)
                .map(|(_, child)| MemoryElement::Node(*child))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn read_text(&self, element: &MemoryElement) -> GatewayResult<String> {
        let state = self.lock();
        let page = state.page()?;
        match element {
            MemoryElement::Node(id) => Ok(page.node(*id)?.text.clone()),
            MemoryElement::NextButton(_) => Ok("›".to_string()),
            MemoryElement::PageButton(_, number) => Ok(format!(" {} ", number)),
        }
    }

    async fn read_attribute(
        &self,
        element: &MemoryElement,
        name: &str,
    ) -> GatewayResult<Option<String>> {
        let state = self.lock();
        let page = state.page()?;
        match element {
            MemoryElement::Node(id) => Ok(page.node(*id)?.attrs.get(name).cloned()),
            MemoryElement::NextButton(index) => {
                let table = page.table(*index)?;
                if name == "disabled" && table.on_last_page() {
                    Ok(Some("true".to_string()))
                } else {
                    Ok(None)
                }
            }
            MemoryElement::PageButton(..) => Ok(None),
        }
    }

    async fn click(&self, element: &MemoryElement) -> GatewayResult<()> {
        let mut state = self.lock();
        let paging = !matches!(element, MemoryElement::Node(_));
        if paging && state.advance_failures > 0 {
            state.advance_failures -= 1;
            return Err(GatewayError::StaleElement(
                "element click intercepted".to_string(),
            ));
        }
        let mut advanced = false;
        {
            let page = state.page_mut()?;
            match element {
                MemoryElement::Node(id) => {
                    let node = page
                        .nodes
                        .get_mut(*id)
                        .ok_or_else(|| GatewayError::StaleElement(format!("node {}", id)))?;
                    if let Some((name, value)) = node.on_click.clone() {
                        node.attrs.insert(name, value);
                    }
                }
                MemoryElement::NextButton(index) => {
                    let table = page
                        .tables
                        .get_mut(*index)
                        .ok_or_else(|| GatewayError::StaleElement(format!("table {}", index)))?;
                    if !table.on_last_page() {
                        table.current_page += 1;
                        advanced = true;
                    }
                }
                MemoryElement::PageButton(index, number) => {
                    let table = page
                        .tables
                        .get_mut(*index)
                        .ok_or_else(|| GatewayError::StaleElement(format!("table {}", index)))?;
                    table.current_page = number.saturating_sub(1);
                    advanced = true;
                }
            }
        }
        if advanced {
            state.advance_clicks += 1;
        }
        Ok(())
    }

    async fn type_text(
        &self,
        element: &MemoryElement,
        text: &str,
        _submit: bool,
    ) -> GatewayResult<()> {
        let mut state = self.lock();
        if let MemoryElement::Node(id) = element {
            let page = state.page_mut()?;
            let node = page
                .nodes
                .get_mut(*id)
                .ok_or_else(|| GatewayError::StaleElement(format!("node {}", id)))?;
            node.attrs.insert("value".to_string(), text.to_string());
        }
        state.typed.push(text.to_string());
        Ok(())
    }

    async fn scroll_to(&self, _y: i64) -> GatewayResult<()> {
        self.lock().scrolls += 1;
        Ok(())
    }

    async fn close(&self) -> GatewayResult<()> {
        self.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/";

    fn wait() -> Duration {
        Duration::from_millis(1)
    }

    #[tokio::test]
    async fn test_navigate_unknown_url_fails() {
        let gateway = MemoryGateway::new();
        let err = gateway.navigate(URL).await.unwrap_err();
        assert!(matches!(err, GatewayError::Navigation { .. }));
        assert_eq!(gateway.navigations(), vec![URL.to_string()]);
    }

    #[tokio::test]
    async fn test_injected_navigation_failures_run_out() {
        let gateway = MemoryGateway::new();
        gateway.add_page(URL, MemoryPage::new());
        gateway.fail_navigation(URL, 2);

        assert!(gateway.navigate(URL).await.is_err());
        assert!(gateway.navigate(URL).await.is_err());
        assert!(gateway.navigate(URL).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_recorded() {
        let gateway = MemoryGateway::new();
        assert!(!gateway.is_closed());
        gateway.close().await.unwrap();
        assert!(gateway.is_closed());
    }

    #[tokio::test]
    async fn test_injected_click_failure_leaves_page_unchanged() {
        let row = Locator::xpath("//table/tr[{row}]");
        let next = Locator::xpath("//button[@id='next']");
        let mut table = MemoryTable::new(row.clone(), 1).next_button(next.clone());
        for i in 1..=2 {
            table = table.row(MemoryNode::with_text(format!("row {}", i)));
        }
        let mut page = MemoryPage::new();
        page.add_table(table);

        let gateway = MemoryGateway::new();
        gateway.add_page(URL, page);
        gateway.navigate(URL).await.unwrap();
        gateway.fail_advance_clicks(1);

        let button = gateway.wait_for(&next, wait()).await.unwrap().unwrap();
        assert!(gateway.click(&button).await.is_err());
        assert_eq!(gateway.advance_clicks(), 0);
        gateway.click(&button).await.unwrap();
        assert_eq!(gateway.advance_clicks(), 1);
    }

    #[tokio::test]
    async fn test_table_paging_with_next_button() {
        let row = Locator::xpath("//table/tr[{row}]");
        let next = Locator::xpath("//button[@id='next']");
        let mut table = MemoryTable::new(row.clone(), 2).next_button(next.clone());
        for i in 1..=3 {
            table = table.row(MemoryNode::with_text(format!("row {}", i)));
        }
        let mut page = MemoryPage::new();
        page.add_table(table);

        let gateway = MemoryGateway::new();
        gateway.add_page(URL, page);
        gateway.navigate(URL).await.unwrap();

        let first = gateway.wait_for(&row.fill("row", 1), wait()).await.unwrap().unwrap();
        assert_eq!(gateway.read_text(&first).await.unwrap(), "row 1");

        let button = gateway.wait_for(&next, wait()).await.unwrap().unwrap();
        assert_eq!(gateway.read_attribute(&button, "disabled").await.unwrap(), None);
        gateway.click(&button).await.unwrap();
        assert_eq!(gateway.advance_clicks(), 1);

        let third = gateway.wait_for(&row.fill("row", 1), wait()).await.unwrap().unwrap();
        assert_eq!(gateway.read_text(&third).await.unwrap(), "row 3");
        assert!(gateway.wait_for(&row.fill("row", 2), wait()).await.unwrap().is_none());
        assert_eq!(
            gateway.read_attribute(&button, "disabled").await.unwrap(),
            Some("true".to_string())
        );
    }

    #[tokio::test]
    async fn test_page_buttons_exist_only_for_real_pages() {
        let row = Locator::xpath("//list/div[{row}]/a");
        let buttons = Locator::xpath("//button[text()=' {page} ']");
        let mut table = MemoryTable::new(row, 2).page_buttons(buttons.clone());
        for i in 1..=3 {
            table = table.row(MemoryNode::with_text(format!("result {}", i)));
        }
        let mut page = MemoryPage::new();
        page.add_table(table);

        let gateway = MemoryGateway::new();
        gateway.add_page(URL, page);
        gateway.navigate(URL).await.unwrap();

        assert!(gateway.wait_for(&buttons.fill("page", 2), wait()).await.unwrap().is_some());
        assert!(gateway.wait_for(&buttons.fill("page", 3), wait()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_click_sets_attribute_and_navigation_resets_state() {
        let tab = Locator::xpath("//button[@id='tab']");
        let mut page = MemoryPage::new();
        page.insert(
            &tab,
            MemoryNode::new()
                .attr("class", "tab")
                .on_click_set("class", "tab is-active"),
        );

        let gateway = MemoryGateway::new();
        gateway.add_page(URL, page);
        gateway.navigate(URL).await.unwrap();

        let element = gateway.wait_for(&tab, wait()).await.unwrap().unwrap();
        gateway.click(&element).await.unwrap();
        assert_eq!(
            gateway.read_attribute(&element, "class").await.unwrap(),
            Some("tab is-active".to_string())
        );

        gateway.navigate(URL).await.unwrap();
        let element = gateway.wait_for(&tab, wait()).await.unwrap().unwrap();
        assert_eq!(
            gateway.read_attribute(&element, "class").await.unwrap(),
            Some("tab".to_string())
        );
    }

    #[tokio::test]
    async fn test_children_resolve_relative_to_scope() {
        let row = Locator::xpath("//row");
        let cell = Locator::xpath("./cell");
        let mut page = MemoryPage::new();
        page.insert(
            &row,
            MemoryNode::new()
                .child(&cell, MemoryNode::with_text("a"))
                .child(&cell, MemoryNode::with_text("b")),
        );

        let gateway = MemoryGateway::new();
        gateway.add_page(URL, page);
        gateway.navigate(URL).await.unwrap();

        let element = gateway.wait_for(&row, wait()).await.unwrap().unwrap();
        let cells = gateway.find_all_within(&element, &cell).await.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(gateway.read_text(&cells[1]).await.unwrap(), "b");
        assert!(gateway.wait_for(&cell, wait()).await.unwrap().is_none());
    }
}
