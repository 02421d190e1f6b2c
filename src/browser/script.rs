//! JavaScript snippet builders for in-page extraction.
//!
//! Every value-bearing string (labels, selectors) is escaped for the JS
//! string-literal context before injection, and label text additionally
//! escaped for embedding inside a `RegExp` source. Snippets return JSON
//! primitives (`string`, `bool`, `null`) so results deserialize without a
//! schema.

/// Currency-shaped text: optional symbol or ISO code, grouped digits with
/// locale separators, optional decimal part, optional K/M/B suffix.
/// Backslashes are doubled because the source is embedded in a JS string
/// literal before reaching `new RegExp`.
pub const CURRENCY_SHAPE_RE: &str = r"^(?:\\p{Sc}|USD|GBP|EUR|CAD|AUD|AED|\u062f\\.?\u0625|A\\$|AU\\$|C\\$|CA\\$)?\\s*\\d[\\d\\s',.\\u00A0\\u202F\\u2009\\u2007\\u2060]*(?:[.,]\\d+)?\\s*(?:[KMB])?$";

/// Bare-numeric text used by the ancestor tree-walk fallback. Doubled
/// backslashes, same reason as above.
pub const BARE_NUMERIC_RE: &str = r"^\\$?\\s*\\d[\\d,]*(?:\\.\\d+)?$";

/// Element pool scanned when anchoring on a label or hunting values.
const TEXT_ELEMENTS: &str = "div,span,p,b,strong,em,label,h1,h2,h3";

/// Sanitize a string for safe injection into a JavaScript string literal.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

/// Escape label text for embedding in a `RegExp` source string, collapsing
/// whitespace runs into `\s+` so "Total Revenue" matches across rewraps.
pub fn label_regex_source(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 8);
    let mut pending_space = false;
    for ch in label.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push_str("\\\\s+");
            pending_space = false;
        }
        if "\\^$.|?*+()[]{}".contains(ch) {
            out.push_str("\\\\");
        }
        out.push(ch);
    }
    out
}

/// Does the visible body text contain the given marker?
pub fn body_contains(marker: &str) -> String {
    format!(
        r#"(() => {{
            const t = (document.body && document.body.innerText) || '';
            return t.includes('{}');
        }})()"#,
        sanitize_js_string(marker)
    )
}

/// Inner text of the nth element matching a selector, or null.
pub fn inner_text(selector: &str, nth: usize) -> String {
    format!(
        r#"(() => {{
            const els = document.querySelectorAll('{}');
            const el = els[{nth}];
            return el ? (el.innerText || el.textContent || '').trim() : null;
        }})()"#,
        sanitize_js_string(selector)
    )
}

/// Whether any element matches the selector.
pub fn element_present(selector: &str) -> String {
    format!(
        r#"(() => !!document.querySelector('{}'))()"#,
        sanitize_js_string(selector)
    )
}

/// Value of the first input matching a selector, or null.
pub fn input_value(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            return el ? el.value : null;
        }})()"#,
        sanitize_js_string(selector)
    )
}

/// Value of the first input inside a container that also holds an element
/// carrying the given class fragments. Used where the price field has no
/// test id and only volatile generated classes identify its wrapper.
pub fn input_value_near_class(class_fragments: &[&str]) -> String {
    let checks = class_fragments
        .iter()
        .map(|f| format!("c.includes('{}')", sanitize_js_string(f)))
        .collect::<Vec<_>>()
        .join(" && ");
    format!(
        r#"(() => {{
            const marked = [...document.querySelectorAll('div')].find(d => {{
                const c = d.className || '';
                return {checks};
            }});
            if (!marked) return null;
            let scope = marked.parentElement;
            for (let i = 0; i < 4 && scope; i++) {{
                const inp = scope.querySelector('input');
                if (inp) return inp.value;
                scope = scope.parentElement;
            }}
            return null;
        }})()"#
    )
}

/// Scroll the first selector match into view and click it natively.
pub fn click(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector('{}');
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"#,
        sanitize_js_string(selector)
    )
}

/// Click the first element of the given tags whose own text matches the
/// pattern (case-insensitive).
pub fn click_by_text(tags: &str, pattern_source: &str) -> String {
    format!(
        r#"(() => {{
            const re = new RegExp('{pattern_source}', 'i');
            const el = [...document.querySelectorAll('{}')].find(e => re.test((e.innerText || '').trim()));
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"#,
        sanitize_js_string(tags)
    )
}

/// Dispatch a synthetic bubbling MouseEvent click at the first element of
/// the given tags whose text matches the pattern. Last-resort path for
/// controls behind overlay hit-testing.
pub fn dispatch_click_by_text(tags: &str, pattern_source: &str) -> String {
    format!(
        r#"(() => {{
            const re = new RegExp('{pattern_source}', 'i');
            const el = [...document.querySelectorAll('{}')].find(e => re.test((e.innerText || '').trim()));
            if (!el) return false;
            el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true }}));
            return true;
        }})()"#,
        sanitize_js_string(tags)
    )
}

/// Geometric below-and-near search: anchor on the label element, then pick
/// the closest visible currency-shaped text strictly below it, within the
/// vertical gap and horizontal center tolerance. Ranked by smallest
/// vertical gap, then Euclidean distance from the label's bottom-center.
pub fn below_near_value(label: &str, max_gap_px: u32, center_tol_px: u32) -> String {
    let label_re = label_regex_source(label);
    format!(
        r#"(() => {{
            const labelRe = new RegExp('^\\s*{label_re}\\s*$', 'i');
            const pool = [...document.querySelectorAll('{TEXT_ELEMENTS}')];
            const label = pool.find(e => labelRe.test((e.innerText || '').trim())
                && e.getBoundingClientRect().height > 0);
            if (!label) return null;
            const rectL = label.getBoundingClientRect();
            const centerLX = rectL.left + rectL.width / 2;
            const isVisible = (el) => {{
                const cs = getComputedStyle(el);
                if (cs.display === 'none' || cs.visibility === 'hidden') return false;
                const r = el.getBoundingClientRect();
                return r.width > 0 && r.height > 0;
            }};
            const RE = new RegExp("{CURRENCY_SHAPE_RE}", 'iu');
            const cands = pool
                .filter(isVisible)
                .map(e => ({{ t: (e.innerText || '').trim(), r: e.getBoundingClientRect() }}))
                .filter(o => o.t && RE.test(o.t) && !labelRe.test(o.t)
                    && o.r.top >= rectL.bottom - 2)
                .filter(o => (o.r.top - rectL.bottom) <= {max_gap_px}
                    && Math.abs((o.r.left + o.r.width / 2) - centerLX) <= {center_tol_px})
                .sort((a, b) => {{
                    const dyA = Math.max(0, a.r.top - rectL.bottom);
                    const dyB = Math.max(0, b.r.top - rectL.bottom);
                    if (dyA !== dyB) return dyA - dyB;
                    const dA = Math.hypot(a.r.left + a.r.width / 2 - centerLX,
                                          a.r.top + a.r.height / 2 - rectL.bottom);
                    const dB = Math.hypot(b.r.left + b.r.width / 2 - centerLX,
                                          b.r.top + b.r.height / 2 - rectL.bottom);
                    return dA - dB;
                }});
            return cands.length ? cands[0].t : null;
        }})()"#
    )
}

/// Ancestor tree-walk: climb up to `depth` ancestor scopes of the label
/// and return the first short descendant text matching the bare-numeric
/// pattern.
pub fn ancestor_walk_value(label: &str, depth: u32) -> String {
    let label_re = label_regex_source(label);
    format!(
        r#"(() => {{
            const labelRe = new RegExp('{label_re}', 'i');
            const pool = [...document.querySelectorAll('{TEXT_ELEMENTS}')];
            const label = pool.find(e => labelRe.test((e.innerText || '').trim()));
            if (!label) return null;
            const money = (t) => new RegExp("{BARE_NUMERIC_RE}").test((t || '').trim());
            const findWithin = (root) => {{
                const walker = document.createTreeWalker(root, NodeFilter.SHOW_ELEMENT);
                while (walker.nextNode()) {{
                    const n = walker.currentNode;
                    if (n === label) continue;
                    const txt = (n.innerText || '').trim();
                    if (!txt || txt.length > 40) continue;
                    if (money(txt)) return txt;
                }}
                return null;
            }};
            let root = label.parentElement;
            for (let i = 0; i < {depth} && root; i++) {{
                const got = findWithin(root);
                if (got) return got;
                root = root.parentElement;
            }}
            return null;
        }})()"#
    )
}
