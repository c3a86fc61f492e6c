//! JavaScript snippets evaluated in the page by the WebDriver backend

/// Attribute marking the element the user clicked during selection
pub const SELECTED_ATTR: &str = "data-page-harvest-selected";

/// Returns tag, class list and parent facts of `arguments[0]`
pub const PROFILE_SCRIPT: &str = r#"
const el = arguments[0];
const parent = el.parentElement;
return {
    tag: el.tagName.toLowerCase(),
    classes: Array.from(el.classList),
    parent: parent ? {
        id: parent.id ? parent.id : null,
        sameTagChildren: Array.from(parent.children)
            .filter(c => c.tagName === el.tagName).length
    } : null
};
"#;

/// Counts elements carrying the class token `arguments[0]`
pub const COUNT_CLASS_SCRIPT: &str = r#"
return document.getElementsByClassName(arguments[0]).length;
"#;

/// Installs hover highlighting and a capture-phase click hook
///
/// Listeners are installed once per document and only act while
/// `window.__pageHarvestArmed` is set, so programmatic clicks made during
/// the crawl are not swallowed.
pub const ARM_SELECTION_SCRIPT: &str = r#"
document.querySelectorAll('[data-page-harvest-selected]')
    .forEach(e => e.removeAttribute('data-page-harvest-selected'));
window.__pageHarvestArmed = true;
if (!window.__pageHarvestHooks) {
    window.__pageHarvestHooks = true;
    document.addEventListener('mouseover', function (e) {
        if (!window.__pageHarvestArmed || !e.target.style) return;
        e.target.__pageHarvestStyle = e.target.style.cssText;
        e.target.style.border = '2px solid red';
        e.target.style.backgroundColor = 'yellow';
    });
    document.addEventListener('mouseout', function (e) {
        if (e.target.__pageHarvestStyle !== undefined) {
            e.target.style.cssText = e.target.__pageHarvestStyle;
            delete e.target.__pageHarvestStyle;
        }
    });
    document.addEventListener('click', function (e) {
        if (!window.__pageHarvestArmed) return;
        e.preventDefault();
        e.stopPropagation();
        document.querySelectorAll('[data-page-harvest-selected]')
            .forEach(el => el.removeAttribute('data-page-harvest-selected'));
        e.target.setAttribute('data-page-harvest-selected', '1');
    }, true);
}
return true;
"#;

/// Stops intercepting clicks and restores any highlighted element
pub const DISARM_SELECTION_SCRIPT: &str = r#"
window.__pageHarvestArmed = false;
document.querySelectorAll('*').forEach(function (el) {
    if (el.__pageHarvestStyle !== undefined) {
        el.style.cssText = el.__pageHarvestStyle;
        delete el.__pageHarvestStyle;
    }
});
return true;
"#;

/// Tags the current document so a later readiness poll can tell whether it was replaced
///
/// Also records when the document starts unloading, which means a real
/// navigation is under way and the settle delay must not apply.
pub const MARK_DOCUMENT_SCRIPT: &str = r#"
window.__pageHarvestMarker = true;
window.__pageHarvestLeaving = false;
if (!window.__pageHarvestUnloadHooks) {
    window.__pageHarvestUnloadHooks = true;
    const leaving = function () { window.__pageHarvestLeaving = true; };
    window.addEventListener('beforeunload', leaving);
    window.addEventListener('pagehide', leaving);
}
return true;
"#;

/// Reports document readiness, whether the marker survived, and whether the
/// marked document is unloading
pub const READY_STATE_SCRIPT: &str = r#"
return {
    state: document.readyState,
    marked: window.__pageHarvestMarker === true,
    leaving: window.__pageHarvestLeaving === true
};
"#;
