//! Terminal rendering of report trees
//!
//! Reports are printed as indented `key: value` lines. Repeated rows are paged
//! so a month of activity does not flood the terminal.

use std::ops::{Range, RangeInclusive};

use crate::api::ApiResponse;

/// Rows shown per page unless overridden
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Most page numbers listed in the page navigation line
const MAX_PAGE_LINKS: usize = 10;

/// Paging state for one list of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub limit: usize,
    pub total: usize,
    /// Current page, 1-based and clamped to the available pages
    pub page: usize,
    pub num_pages: usize,
}

impl Pager {
    pub fn new(limit: usize, total: usize, page: usize) -> Self {
        let limit = limit.max(1);
        let num_pages = total.div_ceil(limit);
        let page = page.clamp(1, num_pages.max(1));

        Self {
            limit,
            total,
            page,
            num_pages,
        }
    }

    /// Indices of the rows on the current page
    pub fn rows(&self) -> Range<usize> {
        let start = ((self.page - 1) * self.limit).min(self.total);
        let end = (start + self.limit).min(self.total);
        start..end
    }

    /// Page numbers to list around the current page
    ///
    /// The window starts four pages back once past page five.
    pub fn window(&self) -> RangeInclusive<usize> {
        let start = if self.page > 5 { self.page - 4 } else { 1 };
        let end = (start + MAX_PAGE_LINKS - 1).min(self.num_pages);
        start..=end
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    /// Footer line, e.g. `Page 2 of 5 (48 total records found)`
    pub fn summary(&self) -> String {
        format!(
            "Page {} of {} ({} total records found)",
            self.page, self.num_pages, self.total
        )
    }

    /// Navigation line with the current page bracketed, e.g. `« 1 [2] 3 »`
    pub fn navigation(&self) -> String {
        let mut parts = Vec::new();
        if self.has_previous() {
            parts.push("«".to_string());
        }
        for page in self.window() {
            if page == self.page {
                parts.push(format!("[{}]", page));
            } else {
                parts.push(page.to_string());
            }
        }
        if self.has_next() {
            parts.push("»".to_string());
        }
        parts.join(" ")
    }
}

/// Options controlling how lists are paged
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub page: usize,
    pub limit: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Renders a report tree as indented text
pub fn render_tree(tree: &ApiResponse, options: RenderOptions) -> String {
    let mut lines = Vec::new();
    write_node(&mut lines, None, tree, 0, options);
    lines.join("\n")
}

fn write_node(
    lines: &mut Vec<String>,
    label: Option<&str>,
    node: &ApiResponse,
    depth: usize,
    options: RenderOptions,
) {
    let indent = "  ".repeat(depth);

    match node {
        ApiResponse::Text(text) => match label {
            Some(label) => lines.push(format!("{}{}: {}", indent, label, text)),
            None => lines.push(format!("{}{}", indent, text)),
        },
        ApiResponse::Node(children) => {
            let child_depth = match label {
                Some(label) => {
                    lines.push(format!("{}{}:", indent, label));
                    depth + 1
                }
                None => depth,
            };
            for (key, child) in children {
                write_node(lines, Some(key), child, child_depth, options);
            }
        }
        ApiResponse::List(items) => {
            let pager = Pager::new(options.limit, items.len(), options.page);
            if let Some(label) = label {
                lines.push(format!("{}{} ({}):", indent, label, items.len()));
            }
            let item_indent = "  ".repeat(depth + 1);

            for index in pager.rows() {
                match &items[index] {
                    ApiResponse::Text(text) => {
                        lines.push(format!("{}- [{}] {}", item_indent, index + 1, text))
                    }
                    item => {
                        lines.push(format!("{}- [{}]", item_indent, index + 1));
                        write_node(lines, None, item, depth + 2, options);
                    }
                }
            }

            if pager.num_pages > 1 {
                lines.push(format!("{}{}", item_indent, pager.navigation()));
                lines.push(format!("{}{}", item_indent, pager.summary()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_xml;

    #[test]
    fn test_pager_counts_pages() {
        let pager = Pager::new(10, 48, 2);

        assert_eq!(pager.num_pages, 5);
        assert_eq!(pager.rows(), 10..20);
        assert_eq!(pager.summary(), "Page 2 of 5 (48 total records found)");
    }

    #[test]
    fn test_pager_last_page_is_partial() {
        let pager = Pager::new(10, 48, 5);

        assert_eq!(pager.rows(), 40..48);
        assert!(pager.has_previous());
        assert!(!pager.has_next());
    }

    #[test]
    fn test_pager_clamps_out_of_range_pages() {
        assert_eq!(Pager::new(10, 48, 99).page, 5);
        assert_eq!(Pager::new(10, 48, 0).page, 1);

        let empty = Pager::new(10, 0, 3);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.num_pages, 0);
        assert_eq!(empty.rows(), 0..0);
    }

    #[test]
    fn test_pager_window_slides_after_page_five() {
        assert_eq!(Pager::new(1, 30, 3).window(), 1..=10);
        assert_eq!(Pager::new(1, 30, 8).window(), 4..=13);
        assert_eq!(Pager::new(1, 30, 29).window(), 25..=30);
    }

    #[test]
    fn test_pager_navigation_marks_current_page() {
        assert_eq!(Pager::new(10, 30, 2).navigation(), "« 1 [2] 3 »");
        assert_eq!(Pager::new(10, 30, 1).navigation(), "[1] 2 3 »");
    }

    #[test]
    fn test_render_nested_report() {
        let tree = parse_xml(
            "<result><total>42</total><summary><clicks>10</clicks></summary></result>",
        )
        .unwrap();

        assert_eq!(
            render_tree(&tree, RenderOptions::default()),
            "total: 42\nsummary:\n  clicks: 10"
        );
    }

    #[test]
    fn test_render_pages_repeated_rows() {
        let tree = parse_xml(
            "<r><row><id>1</id></row><row><id>2</id></row><row><id>3</id></row></r>",
        )
        .unwrap();

        let rendered = render_tree(&tree, RenderOptions { page: 2, limit: 2 });

        assert_eq!(
            rendered,
            "row (3):\n  - [3]\n    id: 3\n  « 1 [2]\n  Page 2 of 2 (3 total records found)"
        );
    }

    #[test]
    fn test_render_scalar_list_on_one_page() {
        let tree = parse_xml("<r><tag>a</tag><tag>b</tag></r>").unwrap();

        assert_eq!(
            render_tree(&tree, RenderOptions::default()),
            "tag (2):\n  - [1] a\n  - [2] b"
        );
    }
}
