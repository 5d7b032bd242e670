// Input adapter: turns key presses and pointer gestures into scene Commands.
//
// Pointer positions arrive already converted to world coordinates; the
// window/camera side of that conversion lives with the renderer. Nothing here
// mutates the scene directly, so every edit goes through the command queue.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use super::config::TriangulationMode;
use super::crowd::AgentId;
use super::geometry::{Point, SAMPLE_MARGIN, sample_in_triangle};
use super::scene::{Command, Scene};

/// What the primary button is currently holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Agent(AgentId),
    /// A free point; it moves once, on release.
    Point(usize),
}

/// Selection and drag state that persists between events.
#[derive(Debug)]
pub struct InputState {
    selected_obstacle: usize,
    /// First endpoint of an edge being drawn (edge-graph mode).
    selected_point: Option<usize>,
    drag: Option<Drag>,
    /// Picks the agent sent to an empty click.
    rng: StdRng,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { selected_obstacle: 0, selected_point: None, drag: None, rng }
    }

    pub fn selected_obstacle(&self) -> usize {
        self.selected_obstacle
    }

    pub fn selected_point(&self) -> Option<usize> {
        self.selected_point
    }

    /// Agent held by the pointer, if any.
    pub fn dragging(&self) -> Option<AgentId> {
        match self.drag {
            Some(Drag::Agent(agent)) => Some(agent),
            _ => None,
        }
    }

    /// Free point held by the pointer, if any.
    pub fn dragging_point(&self) -> Option<usize> {
        match self.drag {
            Some(Drag::Point(index)) => Some(index),
            _ => None,
        }
    }

    /// Key bindings for the selected obstacle:
    ///
    /// | key         | action                               |
    /// |-------------|--------------------------------------|
    /// | arrows      | move by `move_step` (up is +y)       |
    /// | R / shift-R | rotate counter-clockwise / clockwise |
    /// | S / shift-S | shrink / grow                        |
    /// | C / shift-C | select next / previous obstacle      |
    pub fn on_key(&mut self, scene: &Scene, key: KeyCode, shift: bool) -> Option<Command> {
        let count = scene.obstacles().len();
        if count == 0 {
            return None;
        }
        self.selected_obstacle = self.selected_obstacle.min(count - 1);

        let config = scene.config();
        let index = self.selected_obstacle;
        let step = config.move_step;
        let translate = |dx: f64, dy: f64| Command::TranslateObstacle {
            index,
            delta: Point::new(dx, dy),
        };

        match key {
            KeyCode::ArrowRight => Some(translate(step, 0.0)),
            KeyCode::ArrowLeft => Some(translate(-step, 0.0)),
            KeyCode::ArrowUp => Some(translate(0.0, step)),
            KeyCode::ArrowDown => Some(translate(0.0, -step)),
            KeyCode::KeyR => {
                let angle = if shift { -config.rotate_step } else { config.rotate_step };
                Some(Command::RotateObstacle { index, angle })
            }
            KeyCode::KeyS => {
                let factor = if shift { config.scale_factor } else { 1.0 / config.scale_factor };
                Some(Command::ScaleObstacle { index, factor })
            }
            KeyCode::KeyC => {
                self.selected_obstacle = if shift {
                    (index + count - 1) % count
                } else {
                    (index + 1) % count
                };
                None
            }
            _ => None,
        }
    }

    /// Pointer pressed at `at`. Tried in order:
    ///
    /// 1. edge-graph mode only: a point pick selects the first endpoint and a
    ///    pick on a different point emits `AddEdge`; an edge pick emits
    ///    `RemoveEdge`;
    /// 2. an agent under the pointer starts an agent drag;
    /// 3. Delaunay mode only: a free point under the pointer starts a point
    ///    drag (obstacle corners move with their obstacle);
    /// 4. inside an open triangle, a random agent is sent to a fresh interior
    ///    point of that triangle.
    ///
    /// The secondary button clears the point selection.
    pub fn pointer_down(
        &mut self,
        scene: &Scene,
        at: Point,
        button: MouseButton,
    ) -> Option<Command> {
        if button == MouseButton::Right {
            self.selected_point = None;
            return None;
        }
        if button != MouseButton::Left || self.drag.is_some() {
            return None;
        }

        let config = scene.config();
        if scene.mode() == TriangulationMode::EdgeGraph {
            if let Some(picked) = scene.nearest_point(at, config.point_pick_radius) {
                return match self.selected_point.take() {
                    None => {
                        self.selected_point = Some(picked);
                        None
                    }
                    Some(first) if first != picked => Some(Command::AddEdge(first, picked)),
                    Some(_) => None,
                };
            }
            self.selected_point = None;

            if let Some(edge) = scene.nearest_edge(at, config.edge_pick_radius) {
                return Some(Command::RemoveEdge(edge.0, edge.1));
            }
        }

        if let Some(agent) = scene.nearest_agent(at, config.point_pick_radius) {
            self.drag = Some(Drag::Agent(agent));
            return None;
        }

        if scene.mode() == TriangulationMode::Delaunay {
            let free = scene
                .nearest_point(at, config.point_pick_radius)
                .filter(|&index| index < scene.points().len());
            if let Some(index) = free {
                self.drag = Some(Drag::Point(index));
                return None;
            }
        }

        self.send_random_agent(scene, at)
    }

    fn send_random_agent(&mut self, scene: &Scene, at: Point) -> Option<Command> {
        let triangle = scene.locate(at)?;
        let corners = scene.triangles().resolve(triangle).filter(|t| !t.is_obstacle)?.corners;
        let agents = scene.crowd().agents();
        if agents.is_empty() {
            return None;
        }
        let agent = agents[self.rng.gen_range(0..agents.len())].id;
        let position = sample_in_triangle(&mut self.rng, corners, SAMPLE_MARGIN);
        Some(Command::MoveAgent { agent, triangle, position })
    }

    /// Pointer moved to `at`. While dragging an agent, emits `MoveAgent`
    /// whenever the pointer is inside an open triangle; over obstacles or
    /// edges the agent stays where it was. Points only move on release.
    pub fn pointer_move(&mut self, scene: &Scene, at: Point) -> Option<Command> {
        let agent = self.dragging()?;
        let triangle = scene.locate(at)?;
        let open = scene.triangles().resolve(triangle).is_some_and(|t| !t.is_obstacle);
        open.then_some(Command::MoveAgent { agent, triangle, position: at })
    }

    /// Pointer released at `at`. Ends any drag; a held free point is dropped
    /// there with `MovePoint`.
    pub fn pointer_up(&mut self, at: Point) -> Option<Command> {
        match self.drag.take()? {
            Drag::Point(index) => Some(Command::MovePoint { index, to: at }),
            Drag::Agent(_) => None,
        }
    }
}
