//! Plain-text outline view.

use crate::remote::OutlineRemote;
use crate::service::outline_tree::OutlineTree;

const INDENT: &str = "  ";

/// Renders every live node on its own line, indented by depth, as
/// `label  <address>`. Detached nodes never appear.
pub fn render_outline<R: OutlineRemote>(tree: &OutlineTree<R>) -> String {
    let mut out = String::new();
    for (id, depth) in tree.walk() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        out.push_str(node.label());
        out.push_str("  <");
        out.push_str(node.address().as_str());
        out.push_str(">\n");
    }
    out
}
