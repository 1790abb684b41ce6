use crate::core::{ElementHandle, Locator};
use crate::errors::Result;

/// Attribute stamped on every element handed out as an [`ElementHandle`].
pub const REF_ATTRIBUTE: &str = "data-postflow-ref";

pub const PAGE_ACTIVITY_SCRIPT: &str = r#"
    (function() {
        return JSON.stringify({
            ready_state: document.readyState,
            resource_count: performance.getEntriesByType('resource').length
        });
    })()
"#;

/// CSS selector addressing a stamped element.
pub fn ref_selector(element: &ElementHandle) -> String {
    format!(
        "[{}=\"{}\"]",
        REF_ATTRIBUTE,
        element.reference.replace('"', "\\\"")
    )
}

fn scope_expression(scope: Option<&ElementHandle>) -> Result<String> {
    Ok(match scope {
        Some(element) => format!(
            "document.querySelector({})",
            serde_json::to_string(&ref_selector(element))?
        ),
        None => "document".to_string(),
    })
}

/// Script returning a JSON array of references to every element matching
/// `locator`, stamping new elements as it goes.
pub fn find_all_script(scope: Option<&ElementHandle>, locator: &Locator) -> Result<String> {
    Ok(format!(
        r#"
        (function() {{
            const scope = {scope};
            if (!scope) return JSON.stringify([]);
            const needle = {needle};
            const matchText = {match_text};
            window.__postflowRefs = window.__postflowRefs || 0;
            const refs = [];
            for (const el of scope.querySelectorAll({selector})) {{
                if (needle !== null) {{
                    const label = (el.getAttribute('aria-label') || '').toLowerCase();
                    const text = matchText ? (el.innerText || el.textContent || '').toLowerCase() : '';
                    if (!label.includes(needle) && !text.includes(needle)) continue;
                }}
                let ref = el.getAttribute('{attr}');
                if (!ref) {{
                    ref = 'pf-' + (++window.__postflowRefs);
                    el.setAttribute('{attr}', ref);
                }}
                refs.push(ref);
            }}
            return JSON.stringify(refs);
        }})()
        "#,
        scope = scope_expression(scope)?,
        needle = serde_json::to_string(&locator.needle())?,
        match_text = locator.matches_text(),
        selector = serde_json::to_string(&locator.base_selector())?,
        attr = REF_ATTRIBUTE,
    ))
}

pub fn attribute_script(element: &ElementHandle, name: &str) -> Result<String> {
    Ok(format!(
        r#"
        (function() {{
            const el = document.querySelector({selector});
            return JSON.stringify(el ? el.getAttribute({name}) : null);
        }})()
        "#,
        selector = serde_json::to_string(&ref_selector(element))?,
        name = serde_json::to_string(name)?,
    ))
}

/// Plain DOM click, used when a synthesized mouse click cannot land.
pub fn click_script(element: &ElementHandle) -> Result<String> {
    Ok(format!(
        r#"
        (function() {{
            const el = document.querySelector({selector});
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()
        "#,
        selector = serde_json::to_string(&ref_selector(element))?,
    ))
}

/// Submit the element if it is a form, otherwise its enclosing form.
pub fn submit_form_script(element: &ElementHandle) -> Result<String> {
    Ok(format!(
        r#"
        (function() {{
            const el = document.querySelector({selector});
            const form = el && (el.tagName === 'FORM' ? el : el.closest('form'));
            if (!form) return false;
            form.submit();
            return true;
        }})()
        "#,
        selector = serde_json::to_string(&ref_selector(element))?,
    ))
}
