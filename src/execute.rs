//! Renderer boundary — the Execute element of the loop.
//!
//! The rendering surface is an external collaborator; everything here is
//! fire-and-forget from the loop's point of view.

use std::sync::Arc;

use tracing::debug;

use crate::plan::{Action, ElementId, Plan};

/// Visual operations the host rendering surface must provide.
pub trait Renderer: Send + Sync {
    fn apply_zoom(&self, element: &ElementId, scale: f64, line_height: f64);
    fn revert_zoom(&self, element: &ElementId);
    fn apply_high_contrast(&self, element: &ElementId);
    fn clear_high_contrast(&self, element: &ElementId);
}

/// Renderer that does nothing, for headless embedding.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn apply_zoom(&self, _element: &ElementId, _scale: f64, _line_height: f64) {}
    fn revert_zoom(&self, _element: &ElementId) {}
    fn apply_high_contrast(&self, _element: &ElementId) {}
    fn clear_high_contrast(&self, _element: &ElementId) {}
}

/// Dispatches a decided plan to the renderer.
pub struct Executor {
    renderer: Arc<dyn Renderer>,
}

impl Executor {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Forward the plan's actions. `scale` and `line_height` come from the
    /// knowledge layer at the moment of execution.
    pub fn execute(&self, plan: &Plan, scale: f64, line_height: f64) {
        let Some(ref element) = plan.target else {
            return;
        };

        if plan.has(Action::ApplyZoom) {
            self.renderer.apply_zoom(element, scale, line_height);
        } else if plan.has(Action::RevertZoom) {
            self.renderer.revert_zoom(element);
        }

        if plan.has(Action::ApplyHighContrast) {
            self.renderer.apply_high_contrast(element);
        }

        if plan.has(Action::RequestValidation) {
            // Extension point: a human-in-the-loop confirmation would hang
            // off this branch. The renderer is deliberately not involved.
            debug!(element = %element, "Validation requested");
        }
    }

    /// Remove a previously applied contrast inversion without touching zoom.
    pub fn clear_high_contrast(&self, element: &ElementId) {
        self.renderer.clear_high_contrast(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingRenderer {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Renderer for RecordingRenderer {
        fn apply_zoom(&self, element: &ElementId, scale: f64, line_height: f64) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("zoom:{element}:{scale}:{line_height}"));
        }
        fn revert_zoom(&self, element: &ElementId) {
            self.calls.lock().unwrap().push(format!("revert:{element}"));
        }
        fn apply_high_contrast(&self, element: &ElementId) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("contrast:{element}"));
        }
        fn clear_high_contrast(&self, element: &ElementId) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("clear-contrast:{element}"));
        }
    }

    #[test]
    fn zoom_plan_reaches_renderer() {
        let renderer = Arc::new(RecordingRenderer::default());
        let executor = Executor::new(Arc::clone(&renderer) as Arc<dyn Renderer>);

        let plan = Plan {
            actions: vec![Action::ApplyZoom, Action::ApplyHighContrast],
            target: Some(ElementId::from("p-1")),
        };
        executor.execute(&plan, 1.38, 1.8);

        assert_eq!(renderer.calls(), vec!["zoom:p-1:1.38:1.8", "contrast:p-1"]);
    }

    #[test]
    fn empty_plan_touches_nothing() {
        let renderer = Arc::new(RecordingRenderer::default());
        let executor = Executor::new(Arc::clone(&renderer) as Arc<dyn Renderer>);

        executor.execute(&Plan::empty(), 1.3, 1.8);
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn validation_request_is_a_renderer_noop() {
        let renderer = Arc::new(RecordingRenderer::default());
        let executor = Executor::new(Arc::clone(&renderer) as Arc<dyn Renderer>);

        let plan = Plan {
            actions: vec![Action::ApplyZoom, Action::RequestValidation],
            target: Some(ElementId::from("p-1")),
        };
        executor.execute(&plan, 1.3, 1.8);

        assert_eq!(renderer.calls(), vec!["zoom:p-1:1.3:1.8"]);
    }
}
