use super::{CONTEXT_LINES, TAB_SIZE, WRAP_COLUMN};
use crate::util::{expand_tabs, html_escape};
use similar::{group_diff_ops, DiffOp, DiffTag};
use std::fmt::Write;

#[derive(Clone, Copy)]
struct Cell<'a> {
    number: usize,
    text: &'a str,
    class: &'static str,
}

pub(super) fn render_table(
    old_path: &str,
    new_path: &str,
    old: &[&str],
    new: &[&str],
    ops: Vec<DiffOp>,
) -> String {
    let mut out = String::new();
    out.push_str("<table class=\"diff\">\n");
    let _ = writeln!(
        out,
        "<thead><tr><th colspan=\"2\" class=\"diff_header\">{}</th><th colspan=\"2\" class=\"diff_header\">{}</th></tr></thead>",
        html_escape(old_path),
        html_escape(new_path)
    );
    out.push_str("<tbody>\n");

    let groups = group_diff_ops(ops, CONTEXT_LINES);
    if groups.is_empty() {
        out.push_str("<tr><td class=\"diff_none\" colspan=\"4\">No differences found</td></tr>\n");
    }

    let mut shown_until = 0usize;
    for group in &groups {
        let first_old = group.first().map(|op| op.old_range().start).unwrap_or(0);
        if first_old > shown_until {
            push_skip(&mut out);
        }
        for op in group {
            push_op(&mut out, op, old, new);
        }
        shown_until = group.last().map(|op| op.old_range().end).unwrap_or(shown_until);
    }
    if !groups.is_empty() && shown_until < old.len() {
        push_skip(&mut out);
    }

    out.push_str("</tbody>\n</table>\n");
    out
}

fn push_skip(out: &mut String) {
    out.push_str("<tr class=\"diff_skip\"><td colspan=\"4\">&hellip;</td></tr>\n");
}

fn push_op(out: &mut String, op: &DiffOp, old: &[&str], new: &[&str]) {
    let (tag, old_range, new_range) = op.as_tag_tuple();
    let class = match tag {
        DiffTag::Equal => "",
        DiffTag::Delete => "diff_sub",
        DiffTag::Insert => "diff_add",
        DiffTag::Replace => "diff_chg",
    };
    let old_cells: Vec<Cell<'_>> = old_range
        .map(|i| Cell { number: i, text: old[i], class })
        .collect();
    let new_cells: Vec<Cell<'_>> = new_range
        .map(|i| Cell { number: i, text: new[i], class })
        .collect();

    for row in 0..old_cells.len().max(new_cells.len()) {
        push_row(out, old_cells.get(row).copied(), new_cells.get(row).copied());
    }
}

fn push_row(out: &mut String, left: Option<Cell<'_>>, right: Option<Cell<'_>>) {
    let left_parts = left.map(|c| wrap(&expand_tabs(c.text, TAB_SIZE))).unwrap_or_default();
    let right_parts = right.map(|c| wrap(&expand_tabs(c.text, TAB_SIZE))).unwrap_or_default();

    for i in 0..left_parts.len().max(right_parts.len()).max(1) {
        out.push_str("<tr>");
        push_cell(out, left, left_parts.get(i), i);
        push_cell(out, right, right_parts.get(i), i);
        out.push_str("</tr>\n");
    }
}

fn push_cell(out: &mut String, cell: Option<Cell<'_>>, part: Option<&String>, index: usize) {
    let number = match (cell, index) {
        (Some(c), 0) => (c.number + 1).to_string(),
        (Some(_), _) if part.is_some() => "&gt;".to_string(),
        _ => String::new(),
    };
    let class = cell.map(|c| c.class).unwrap_or("");
    let text = part.map(|p| html_escape(p)).unwrap_or_default();

    let _ = write!(out, "<td class=\"diff_header\">{number}</td>");
    if class.is_empty() {
        let _ = write!(out, "<td nowrap=\"nowrap\">{text}</td>");
    } else {
        let _ = write!(out, "<td nowrap=\"nowrap\" class=\"{class}\">{text}</td>");
    }
}

/// Split a line into chunks of at most `WRAP_COLUMN` characters.
fn wrap(line: &str) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(WRAP_COLUMN)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
