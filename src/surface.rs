//! The rendering surface the draw pass writes into.

use std::collections::HashMap;

/// Class names toggled on elements by the engine.
pub mod class {
    pub const SCROLLING: &str = "Scrolling";
    pub const TEXT_INSIDE: &str = "Inside";
    pub const TEXT_OUTSIDE: &str = "Outside";
    pub const ARROW_LEFT: &str = "Left";
    pub const ARROW_RIGHT: &str = "Right";
    pub const DRAGGING: &str = "Dragging";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u64);

impl ElementRef {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementStyle {
    pub translate_x: f64,
    pub translate_y: f64,
    pub width: Option<f64>,
    pub opacity: f64,
    pub classes: Vec<&'static str>,
    pub text: Option<String>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            width: None,
            opacity: 1.0,
            classes: Vec::new(),
            text: None,
        }
    }
}

impl ElementStyle {
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|class| *class == name)
    }

    pub fn set_class(&mut self, name: &'static str, enabled: bool) {
        let present = self.has_class(name);
        if enabled && !present {
            self.classes.push(name);
        } else if !enabled && present {
            self.classes.retain(|class| *class != name);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

/// Element handles supporting style mutation and size observation.
pub trait Surface {
    fn style(&self, element: ElementRef) -> Option<&ElementStyle>;

    fn style_mut(&mut self, element: ElementRef) -> Option<&mut ElementStyle>;

    /// The element's laid-out width, if it is still mounted.
    fn measure_width(&self, element: ElementRef) -> Option<f64>;
}

/// A surface that can also create and release elements.
pub trait Mount: Surface {
    fn mount(&mut self, intrinsic_width: f64) -> ElementRef;

    fn unmount(&mut self, element: ElementRef);
}

#[derive(Debug, Clone)]
struct RetainedElement {
    style: ElementStyle,
    intrinsic_width: f64,
}

/// A retained element store. Hosts that paint immediately (such as a canvas)
/// read the styles back after each draw pass.
#[derive(Debug, Default)]
pub struct RetainedSurface {
    next_id: u64,
    elements: HashMap<ElementRef, RetainedElement>,
}

impl RetainedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, intrinsic_width: f64) -> ElementRef {
        let element = ElementRef(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            element,
            RetainedElement {
                style: ElementStyle::default(),
                intrinsic_width,
            },
        );
        element
    }

    pub fn remove(&mut self, element: ElementRef) -> bool {
        self.elements.remove(&element).is_some()
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        self.elements.contains_key(&element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Surface for RetainedSurface {
    fn style(&self, element: ElementRef) -> Option<&ElementStyle> {
        self.elements.get(&element).map(|entry| &entry.style)
    }

    fn style_mut(&mut self, element: ElementRef) -> Option<&mut ElementStyle> {
        self.elements.get_mut(&element).map(|entry| &mut entry.style)
    }

    fn measure_width(&self, element: ElementRef) -> Option<f64> {
        self.elements.get(&element).map(|entry| entry.intrinsic_width)
    }
}

impl Mount for RetainedSurface {
    fn mount(&mut self, intrinsic_width: f64) -> ElementRef {
        RetainedSurface::create(self, intrinsic_width)
    }

    fn unmount(&mut self, element: ElementRef) {
        RetainedSurface::remove(self, element);
    }
}
