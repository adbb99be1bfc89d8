//! Per-site selector maps
//!
//! Every element the crawler looks for is addressed through a [`Locator`]
//! defined here. The defaults target the PNCP tender pages; any subset can be
//! overridden from the `[selectors]` section of the config file when the
//! markup changes.

use crate::gateway::Locator;
use serde::Deserialize;

const ITEMS_GRID: &str = "//*[@id=\"main-content\"]/pncp-item-detail/div/pncp-tab-set/div/pncp-tab[1]/div/div/pncp-table/div/ngx-datatable/div/datatable-body/datatable-selection/datatable-scroller";
const DOCUMENTS_GRID: &str = "//*[@id=\"main-content\"]/pncp-item-detail/div/pncp-tab-set/div/pncp-tab[2]/div/div/pncp-table/div/ngx-datatable/div/datatable-body/datatable-selection/datatable-scroller";
const HISTORY_GRID: &str = "//*[@id=\"main-content\"]/pncp-item-detail/div/pncp-tab-set/div/pncp-tab[3]/div/div/pncp-table/div/ngx-datatable/div/datatable-body/datatable-selection/datatable-scroller";
const NEXT_PAGE_BUTTON: &str = "button[contains(@aria-label,\"Ir para próxima página\")]";

/// All selector groups
///
/// Groups are independent: a group left out of the config file keeps its
/// defaults. A table group, once given, must be given in full.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    pub search: SearchSelectors,
    pub detail: DetailSelectors,
    pub items: TableSelectors,
    pub history: TableSelectors,
    pub documents: DocumentSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            search: SearchSelectors::default(),
            detail: DetailSelectors::default(),
            items: TableSelectors::for_tab("Itens", ITEMS_GRID, 1),
            history: TableSelectors::for_tab("Histórico", HISTORY_GRID, 3),
            documents: DocumentSelectors::default(),
        }
    }
}

/// Search page: the keyword box and the result list
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchSelectors {
    pub input: Locator,
    /// Result link, template with `{row}`
    pub result_row: Locator,
    /// Listing date, relative to the result link
    pub result_date: Locator,
    /// Numbered paging control, template with `{page}`
    pub page_button: Locator,
    pub page_size: usize,
}

impl Default for SearchSelectors {
    fn default() -> Self {
        Self {
            input: Locator::xpath("//*[@id=\"keyword\"]"),
            result_row: Locator::xpath(
                "//*[@id=\"main-content\"]/pncp-list/pncp-results-panel/pncp-tab-set/div/pncp-tab[1]/div/div[2]/div/div[2]/pncp-items-list/div/div[{row}]/a",
            ),
            result_date: Locator::xpath("./div/div[1]/div/div/div[2]/div[3]/div[2]"),
            page_button: Locator::xpath("//button[text()=\" {page} \"]"),
            page_size: 10,
        }
    }
}

/// Detail page header
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetailSelectors {
    pub container: Locator,
    /// Value next to a label, template with `{label}`
    pub field: Locator,
    pub object: Locator,
    pub total_value: Locator,
    /// Class carried by the active tab button
    pub active_class: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            container: Locator::xpath("//*[@id=\"main-content\"]"),
            field: Locator::xpath("//strong[contains(.,\"{label}\")]/following-sibling::span"),
            object: Locator::xpath("//strong[contains(., 'Objeto:')]/following::span[1]"),
            total_value: Locator::xpath(
                "//strong[contains(text(), 'VALOR TOTAL ESTIMADO')]/following-sibling::*//span",
            ),
            active_class: "is-active".to_string(),
        }
    }
}

/// One tab of the detail page and the virtualized grid inside it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TableSelectors {
    pub tab: Locator,
    pub grid: Locator,
    /// Row, template with `{row}` counted within the rendered page window
    pub row: Locator,
    /// Cells, relative to the row
    pub cell: Locator,
    /// Value span, relative to a cell
    pub value: Locator,
    pub next_page: Locator,
    pub page_size: usize,
}

impl TableSelectors {
    fn for_tab(label: &str, grid: &str, tab_index: u32) -> Self {
        Self {
            tab: Locator::xpath(format!("//span[text()='{}']/parent::button", label)),
            grid: Locator::xpath(grid),
            row: Locator::xpath(format!(
                "{}/datatable-row-wrapper[{{row}}]/datatable-body-row",
                grid
            )),
            cell: Locator::xpath("./div[2]/datatable-body-cell"),
            value: Locator::xpath("./div/span"),
            next_page: Locator::xpath(format!(
                "//*[@id=\"main-content\"]/pncp-item-detail/div/pncp-tab-set/div/pncp-tab[{}]//{}",
                tab_index, NEXT_PAGE_BUTTON
            )),
            page_size: 5,
        }
    }
}

/// Documents tab: a table plus the link and notice-category filter
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DocumentSelectors {
    pub table: TableSelectors,
    /// Document link, relative to a cell
    pub link: Locator,
    /// Value of the type cell's `title` attribute for retained documents
    pub notice_category: String,
}

impl Default for DocumentSelectors {
    fn default() -> Self {
        Self {
            table: TableSelectors::for_tab("Arquivos", DOCUMENTS_GRID, 2),
            link: Locator::xpath("./div/div/a"),
            notice_category: "Edital".to_string(),
        }
    }
}
