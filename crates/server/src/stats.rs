//! Player aggregates derived from cells.
//!
//! Nothing here runs on its own: whoever mutates a player's cells calls
//! [`refresh`] (or [`refresh_all`]) before the state is observed.

use crate::entity::Player;
use crate::world::World;

/// Recompute a player's total mass and the position/radius of its largest cell.
/// The first cell wins ties.
pub fn refresh(player: &mut Player) {
    debug_assert!(!player.cells.is_empty(), "refreshing player {} with no cells", player.id);

    let mut mass = 0.0;
    let mut largest: Option<(f64, glam::DVec2)> = None;
    for cell in &player.cells {
        mass += cell.mass();
        if largest.is_none_or(|(radius, _)| cell.radius() > radius) {
            largest = Some((cell.radius(), cell.position));
        }
    }

    player.mass = mass;
    if let Some((radius, position)) = largest {
        player.radius = radius;
        player.position = position;
    }
}

/// Refresh every player in the world.
pub fn refresh_all(world: &mut World) {
    for player in world.players.values_mut() {
        refresh(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Cell;
    use glam::DVec2;
    use protocol::Color;

    #[test]
    fn test_mass_is_the_sum_of_cells() {
        let first = Cell::new(2, DVec2::ZERO, 100.0);
        let mut player = Player::new(1, "p".into(), Color::default(), first);
        player.cells.push(Cell::new(3, DVec2::new(50.0, 0.0), 300.0));
        player.cells.push(Cell::new(4, DVec2::new(90.0, 0.0), 25.5));

        refresh(&mut player);
        assert_eq!(player.mass, 425.5);
        assert_eq!(player.position, DVec2::new(50.0, 0.0));
        assert_eq!(player.radius, player.cells[1].radius());
    }

    #[test]
    fn test_first_largest_cell_wins_ties() {
        let first = Cell::new(2, DVec2::new(1.0, 1.0), 200.0);
        let mut player = Player::new(1, "p".into(), Color::default(), first);
        player.cells.push(Cell::new(3, DVec2::new(9.0, 9.0), 200.0));

        refresh(&mut player);
        assert_eq!(player.position, DVec2::new(1.0, 1.0));
    }

    #[test]
    fn test_refresh_all_covers_every_player() {
        let mut world = World::new(2000.0, 2000.0, Some(3));
        let a = world.spawn_player(100.0);
        let b = world.spawn_player(100.0);
        for id in [a, b] {
            world.players.get_mut(&id).unwrap().cells[0].on_eat(50.0);
        }

        refresh_all(&mut world);
        assert_eq!(world.players[&a].mass, 150.0);
        assert_eq!(world.players[&b].mass, 150.0);
        world.assert_invariants();
    }
}
