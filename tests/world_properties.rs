use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use snake_q_table::config::{GridConfig, RewardConfig};
use snake_q_table::game::{mask_action, Game, StepEvent, INITIAL_LEN};
use snake_q_table::pos::{Dir, Pos};
use std::collections::HashSet;

fn grid() -> GridConfig {
    GridConfig::new(800, 600, 10)
}

fn small_grid() -> GridConfig {
    GridConfig::new(60, 60, 10)
}

#[test]
fn random_play_respects_body_invariants() {
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut game = Game::new(small_grid(), RewardConfig::default(), &mut rng);
        let mut moves_since_growth = 0;
        for _ in 0..500 {
            let before_dir = game.dir();
            let requested = Dir::ALL[rng.gen_range(0..4)];
            let target_before = game.target_len();
            let out = game.step(requested, &mut rng);
            assert_eq!(out.done, out.event.is_terminal());

            // the effective heading never reverses
            assert_ne!(game.dir(), before_dir.opposite());
            assert_eq!(game.dir(), mask_action(before_dir, requested));

            let snake = game.snake();
            assert!(snake.len() <= game.target_len());
            let unique: HashSet<Pos> = snake.iter().copied().collect();
            assert_eq!(unique.len(), snake.len(), "body repeats a cell");

            match out.event {
                StepEvent::OutOfBounds | StepEvent::SelfCollision => {
                    assert!(out.done);
                    assert_eq!(out.reward, -10000.0);
                    assert_eq!(game.target_len(), target_before);
                    break;
                }
                StepEvent::Ate => {
                    assert!(!out.done);
                    assert_eq!(out.reward, 1000.0);
                    assert_eq!(game.target_len(), target_before + 1);
                    assert!(!game.snake_contains(game.food()));
                    moves_since_growth = 0;
                }
                StepEvent::Moved => {
                    assert!(!out.done);
                    assert_eq!(out.reward, -10.0);
                    assert_eq!(game.target_len(), target_before);
                    assert!(!game.snake_contains(game.food()));
                    moves_since_growth += 1;
                    if moves_since_growth >= game.target_len() - 1 {
                        assert_eq!(snake.len(), game.target_len());
                    }
                }
            }
        }
    }
}

#[test]
fn observation_matches_fresh_encoding() {
    let mut rng = SmallRng::seed_from_u64(99);
    let mut game = Game::new(grid(), RewardConfig::default(), &mut rng);
    for _ in 0..200 {
        let out = game.step(Dir::ALL[rng.gen_range(0..4)], &mut rng);
        if out.done {
            break;
        }
        assert_eq!(out.observation, game.observe());
    }
}

#[test]
fn hundred_ordinary_steps_cost_ten_each() {
    let mut rng = SmallRng::seed_from_u64(4);
    // a length-3 snake in a big open area, food far away in the corner
    let body = [Pos::new(380, 300), Pos::new(390, 300), Pos::new(400, 300)];
    let rewards = RewardConfig::default();
    let mut game =
        Game::from_parts(grid(), rewards, body, Dir::Right, Pos::new(0, 590), 3).unwrap();

    // one square lap, 25 steps per side
    let plan = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];
    let mut steps = 0;
    for dir in plan {
        for _ in 0..25 {
            let out = game.step(dir, &mut rng);
            assert_eq!(out.event, StepEvent::Moved);
            assert_eq!(out.reward, -10.0);
            assert!(!out.done);
            assert_eq!(game.snake().len(), 3);
            steps += 1;
        }
    }
    assert_eq!(steps, 100);
}

#[test]
fn reset_after_death_restores_initial_layout() {
    let mut rng = SmallRng::seed_from_u64(12);
    let mut game = Game::new(grid(), RewardConfig::default(), &mut rng);
    while !game.step(Dir::Up, &mut rng).done {}
    let obs = game.reset(&mut rng);
    assert!(game.alive());
    assert_eq!(game.head(), Pos::new(400, 300));
    assert_eq!(game.snake().len(), 1);
    assert_eq!(game.target_len(), INITIAL_LEN);
    assert_eq!(game.dir(), Dir::Right);
    assert_eq!(obs, game.observe());
}
