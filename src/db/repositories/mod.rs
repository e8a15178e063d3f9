mod season_actions;
mod segments;
