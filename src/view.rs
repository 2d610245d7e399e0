use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use crate::{
    canvas::{Canvas, CanvasListener},
    cmd::Cmd,
    config::{self, CommandVerb, Config},
    error::CanvasError,
    input::Pointer,
    math::{vec2, Vec2f},
    raster::{Raster, Rgba, StrokeSegment},
};

/// Widest a toolbar slot gets, in pixels.
const MAX_SLOT_WIDTH: u32 = 90;
const BUTTON_PADDING: u32 = 5;

/// The listener half of a view: the image currently on screen.
pub struct Frame {
    image: RefCell<Raster>,
    /// Asks the windowing layer for a repaint.
    repaint: Box<dyn Fn()>,
}

impl Frame {
    pub fn new(width: u32, height: u32, repaint: impl Fn() + 'static) -> Self {
        Self {
            image: RefCell::new(Raster::blank(width, height)),
            repaint: Box::new(repaint),
        }
    }

    pub fn image(&self) -> Ref<'_, Raster> {
        self.image.borrow()
    }
}

impl CanvasListener for Frame {
    fn raster_updated(&self, raster: Option<&Raster>) -> Result<(), CanvasError> {
        let raster = raster.ok_or(CanvasError::InvalidArgument("no raster to display"))?;

        let mut image = self.image.borrow_mut();
        if (raster.width(), raster.height()) != (image.width(), image.height()) {
            return Err(CanvasError::InvalidArgument(
                "raster size does not match the view",
            ));
        }
        image.copy_from(raster);
        drop(image);

        (self.repaint)();
        Ok(())
    }
}

/// What a toolbar button does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    SetColor(Rgba),
    Clear,
}

impl ButtonAction {
    fn cmd(self) -> Cmd {
        match self {
            ButtonAction::SetColor(color) => Cmd::SetColor { color },
            ButtonAction::Clear => Cmd::Clear,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolbarButton {
    pub label: String,
    pub action: ButtonAction,
    /// Top-left corner, relative to the toolbar.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ToolbarButton {
    fn contains(&self, pos: Vec2f) -> bool {
        let (x, y) = (pos.x(), pos.y());
        x >= self.x as f32
            && y >= self.y as f32
            && x < (self.x + self.width) as f32
            && y < (self.y + self.height) as f32
    }

    #[cfg(test)]
    pub fn center(&self) -> Vec2f {
        vec2(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Strip of buttons below the drawing area.
pub struct Toolbar {
    width: u32,
    height: u32,
    background: Rgba,
    buttons: Vec<ToolbarButton>,
}

impl Toolbar {
    /// Lays the configured buttons out left to right in equally sized slots.
    pub fn new(width: u32, config: &config::ToolbarConfig, buttons: &[config::Button]) -> Self {
        let n = buttons.len() as u32;
        let slot = if n == 0 {
            0
        } else {
            (width / n).min(MAX_SLOT_WIDTH)
        };
        let pad_x = BUTTON_PADDING.min(slot / 4);
        let pad_y = BUTTON_PADDING.min(config.height / 4);

        let buttons = buttons
            .iter()
            .zip(0..)
            .map(|(button, i)| {
                let action = match button.verb {
                    CommandVerb::Color => {
                        ButtonAction::SetColor(button.color.map_or(Rgba::BLACK, |c| c.0))
                    }
                    CommandVerb::Clear => ButtonAction::Clear,
                };
                ToolbarButton {
                    label: button.label.clone(),
                    action,
                    x: i * slot + pad_x,
                    y: pad_y,
                    width: slot - 2 * pad_x,
                    height: config.height - 2 * pad_y,
                }
            })
            .collect();

        Self {
            width,
            height: config.height,
            background: config.background.0,
            buttons,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[cfg(test)]
    pub fn buttons(&self) -> &[ToolbarButton] {
        &self.buttons
    }

    /// Returns the button under `pos` (relative to the toolbar), if any.
    pub fn hit(&self, pos: Vec2f) -> Option<&ToolbarButton> {
        self.buttons.iter().find(|b| b.contains(pos))
    }

    /// Color buttons are drawn as framed swatches, the clear button as a cross.
    pub fn render(&self) -> Raster {
        let mut raster = Raster::new(self.width, self.height, self.background);
        for b in &self.buttons {
            raster.fill_rect(b.x, b.y, b.width, b.height, Rgba::LIGHT_GRAY);
            match b.action {
                ButtonAction::SetColor(color) => {
                    raster.fill_rect(
                        b.x + 2,
                        b.y + 2,
                        b.width.saturating_sub(4),
                        b.height.saturating_sub(4),
                        color,
                    );
                }
                ButtonAction::Clear => {
                    let inset = 6.0f32.min(b.width.min(b.height) as f32 / 3.0);
                    let (x0, y0) = (b.x as f32 + inset, b.y as f32 + inset);
                    let (x1, y1) = (
                        (b.x + b.width) as f32 - 1.0 - inset,
                        (b.y + b.height) as f32 - 1.0 - inset,
                    );
                    for (start, end) in [((x0, y0), (x1, y1)), ((x0, y1), (x1, y0))] {
                        raster.stroke_segment(
                            StrokeSegment {
                                start: vec2(start.0, start.1),
                                end: vec2(end.0, end.1),
                            },
                            1.0,
                            Rgba::DARK_GRAY,
                        );
                    }
                }
            }
        }
        raster
    }
}

/// One window onto the shared canvas: displays broadcasts and turns pointer input into commands.
pub struct View {
    canvas: Rc<RefCell<Canvas>>,
    frame: Rc<Frame>,
    toolbar: Toolbar,
    /// Set while a stroke that started in the drawing area is in progress.
    stroking: bool,
}

impl View {
    /// Creates a view of `canvas` and registers it for broadcasts.
    ///
    /// `repaint` is invoked whenever the displayed image changes.
    pub fn new(canvas: Rc<RefCell<Canvas>>, config: &Config, repaint: impl Fn() + 'static) -> Self {
        let (width, height) = {
            let canvas = canvas.borrow();
            (canvas.width(), canvas.height())
        };
        let frame = Rc::new(Frame::new(width, height, repaint));
        canvas.borrow_mut().register_listener(&frame);

        Self {
            canvas,
            frame,
            toolbar: Toolbar::new(width, &config.toolbar, &config.buttons),
            stroking: false,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn toolbar(&self) -> &Toolbar {
        &self.toolbar
    }

    /// Size of the drawing area.
    pub fn canvas_size(&self) -> (u32, u32) {
        let image = self.frame.image();
        (image.width(), image.height())
    }

    /// Size of the whole window: drawing area plus toolbar.
    pub fn window_size(&self) -> (u32, u32) {
        let (width, height) = self.canvas_size();
        (width, height + self.toolbar.height())
    }

    pub fn pointer(&mut self, event: Pointer) -> Result<(), CanvasError> {
        let canvas_height = self.canvas_size().1 as f32;
        match event {
            Pointer::Press(pos) if pos.y() < canvas_height => {
                self.stroking = true;
                // A plain click still leaves a dot behind.
                self.apply(Cmd::SetStrokeOrigin { position: pos })?;
                self.apply(Cmd::DrawTo { position: pos })
            }
            Pointer::Press(pos) => {
                let Some(button) = self.toolbar.hit(pos - vec2(0.0, canvas_height)) else {
                    return Ok(());
                };
                log::debug!("toolbar button '{}' pressed", button.label);
                let action = button.action;
                self.apply(action.cmd())?;
                if let ButtonAction::SetColor(_) = action {
                    log::debug!("brush color is now {}", self.canvas.borrow().brush_color());
                }
                Ok(())
            }
            Pointer::Drag(pos) if self.stroking => self.apply(Cmd::DrawTo { position: pos }),
            Pointer::Drag(_) => Ok(()),
            Pointer::Release => {
                self.stroking = false;
                Ok(())
            }
        }
    }

    fn apply(&mut self, cmd: Cmd) -> Result<(), CanvasError> {
        let res = self.canvas.borrow_mut().apply(cmd);
        if res.is_err() {
            self.stroking = false;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn config() -> Config {
        Config::builtin().unwrap()
    }

    fn shared_canvas(config: &Config) -> Rc<RefCell<Canvas>> {
        Rc::new(RefCell::new(Canvas::new(
            config.canvas.width,
            config.canvas.height,
        )))
    }

    fn counting_view(canvas: &Rc<RefCell<Canvas>>, config: &Config) -> (View, Rc<Cell<u32>>) {
        let repaints = Rc::new(Cell::new(0));
        let counter = repaints.clone();
        let view = View::new(canvas.clone(), config, move || {
            counter.set(counter.get() + 1)
        });
        (view, repaints)
    }

    /// Window position of the toolbar button with the given label.
    fn button_pos(view: &View, label: &str) -> Vec2f {
        let button = view
            .toolbar()
            .buttons()
            .iter()
            .find(|b| b.label == label)
            .unwrap();
        button.center() + vec2(0.0, view.canvas_size().1 as f32)
    }

    #[test]
    fn new_view_registers_and_shows_blank() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (view, repaints) = counting_view(&canvas, &config);

        assert_eq!(canvas.borrow().listener_count(), 1);
        assert!(view.frame().image().is_blank());
        assert_eq!(view.canvas_size(), (640, 480));
        assert_eq!(view.window_size(), (640, 480 + 45));
        assert_eq!(repaints.get(), 0);
    }

    #[test]
    fn strokes_show_up_in_every_view() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut a, a_repaints) = counting_view(&canvas, &config);
        let (b, b_repaints) = counting_view(&canvas, &config);

        a.pointer(Pointer::Press(vec2(10.0, 10.0))).unwrap();
        a.pointer(Pointer::Drag(vec2(30.0, 10.0))).unwrap();
        a.pointer(Pointer::Drag(vec2(30.0, 40.0))).unwrap();
        a.pointer(Pointer::Release).unwrap();

        assert_eq!(a_repaints.get(), 3);
        assert_eq!(b_repaints.get(), 3);
        assert_eq!(*a.frame().image(), *canvas.borrow().raster());
        assert_eq!(*b.frame().image(), *canvas.borrow().raster());
        for (x, y) in [(10, 10), (20, 10), (30, 25)] {
            assert_eq!(b.frame().image().get(x, y), Some(Rgba::BLACK));
        }
    }

    #[test]
    fn drag_without_press_does_nothing() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut view, repaints) = counting_view(&canvas, &config);

        view.pointer(Pointer::Drag(vec2(5.0, 5.0))).unwrap();
        view.pointer(Pointer::Press(vec2(5.0, 5.0))).unwrap();
        view.pointer(Pointer::Release).unwrap();
        view.pointer(Pointer::Drag(vec2(50.0, 50.0))).unwrap();

        assert_eq!(repaints.get(), 1);
        assert_eq!(view.frame().image().get(50, 50), Some(Rgba::WHITE));
    }

    #[test]
    fn toolbar_colors_apply_across_views() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut a, _) = counting_view(&canvas, &config);
        let (mut b, b_repaints) = counting_view(&canvas, &config);

        b.pointer(Pointer::Press(button_pos(&b, "red"))).unwrap();
        b.pointer(Pointer::Release).unwrap();
        assert_eq!(canvas.borrow().brush_color(), Rgba::RED);
        assert_eq!(b_repaints.get(), 0, "picking a color does not repaint");

        a.pointer(Pointer::Press(vec2(100.0, 100.0))).unwrap();
        a.pointer(Pointer::Release).unwrap();
        assert_eq!(b.frame().image().get(100, 100), Some(Rgba::RED));

        b.pointer(Pointer::Press(button_pos(&b, "eraser"))).unwrap();
        b.pointer(Pointer::Release).unwrap();
        a.pointer(Pointer::Press(vec2(100.0, 100.0))).unwrap();
        assert_eq!(b.frame().image().get(100, 100), Some(Rgba::WHITE));
    }

    #[test]
    fn dragging_from_the_toolbar_does_not_draw() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut view, _) = counting_view(&canvas, &config);

        view.pointer(Pointer::Press(button_pos(&view, "blue"))).unwrap();
        view.pointer(Pointer::Drag(vec2(100.0, 100.0))).unwrap();
        assert!(canvas.borrow().raster().is_blank());
        assert_eq!(canvas.borrow().anchor(), None);
    }

    #[test]
    fn clear_button_blanks_every_view() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut a, _) = counting_view(&canvas, &config);
        let (mut b, _) = counting_view(&canvas, &config);

        a.pointer(Pointer::Press(vec2(20.0, 20.0))).unwrap();
        a.pointer(Pointer::Drag(vec2(200.0, 200.0))).unwrap();
        a.pointer(Pointer::Release).unwrap();
        assert!(!a.frame().image().is_blank());

        b.pointer(Pointer::Press(button_pos(&b, "new canvas"))).unwrap();
        assert!(a.frame().image().is_blank());
        assert!(b.frame().image().is_blank());
        assert_eq!(canvas.borrow().anchor(), None);
    }

    #[test]
    fn clear_mid_stroke_is_reported() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut a, _) = counting_view(&canvas, &config);

        a.pointer(Pointer::Press(vec2(20.0, 20.0))).unwrap();
        canvas.borrow_mut().clear().unwrap();

        let err = a.pointer(Pointer::Drag(vec2(40.0, 40.0))).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidState(_)));
        assert!(a.frame().image().is_blank());
        // The failed stroke is over; further drags are ignored.
        a.pointer(Pointer::Drag(vec2(50.0, 50.0))).unwrap();
    }

    #[test]
    fn press_between_buttons_is_ignored() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut view, repaints) = counting_view(&canvas, &config);

        // Right edge of the toolbar, past the last button.
        view.pointer(Pointer::Press(vec2(639.0, 500.0))).unwrap();
        assert_eq!(repaints.get(), 0);
        assert_eq!(canvas.borrow().brush_color(), Rgba::BLACK);
    }

    #[test]
    fn absent_raster_is_rejected() {
        let repaints = Rc::new(Cell::new(0));
        let counter = repaints.clone();
        let frame = Frame::new(4, 4, move || counter.set(counter.get() + 1));

        let mut drawn = Raster::blank(4, 4);
        drawn.fill_rect(0, 0, 2, 2, Rgba::BLUE);
        frame.raster_updated(Some(&drawn)).unwrap();
        assert_eq!(repaints.get(), 1);

        let err = frame.raster_updated(None).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidArgument(_)));
        assert_eq!(*frame.image(), drawn);
        assert_eq!(repaints.get(), 1);

        let err = frame.raster_updated(Some(&Raster::blank(5, 4))).unwrap_err();
        assert!(matches!(err, CanvasError::InvalidArgument(_)));
        assert_eq!(*frame.image(), drawn);
    }

    #[test]
    fn closed_view_stops_receiving() {
        let config = config();
        let canvas = shared_canvas(&config);
        let (mut a, a_repaints) = counting_view(&canvas, &config);
        let (b, _) = counting_view(&canvas, &config);
        drop(b);

        a.pointer(Pointer::Press(vec2(1.0, 1.0))).unwrap();
        assert_eq!(a_repaints.get(), 1);
        assert_eq!(canvas.borrow().listener_count(), 1);
    }

    #[test]
    fn toolbar_layout_and_rendering() {
        let config = config();
        let toolbar = Toolbar::new(640, &config.toolbar, &config.buttons);
        let buttons = toolbar.buttons();
        assert_eq!(buttons.len(), 5);
        for pair in buttons.windows(2) {
            assert!(pair[0].x + pair[0].width <= pair[1].x);
        }
        assert_eq!(buttons[0].action, ButtonAction::SetColor(Rgba::BLACK));
        assert_eq!(buttons[3].action, ButtonAction::SetColor(Rgba::WHITE));
        assert_eq!(buttons[4].action, ButtonAction::Clear);
        assert_eq!(toolbar.hit(buttons[2].center()).unwrap().label, "blue");
        assert!(toolbar.hit(vec2(0.0, 0.0)).is_none());

        let image = toolbar.render();
        assert_eq!((image.width(), image.height()), (640, 45));
        assert_eq!(image.get(0, 0), Some(Rgba::DARK_GRAY));
        let c = buttons[1].center();
        assert_eq!(image.get(c.x() as u32, c.y() as u32), Some(Rgba::RED));
    }
}
