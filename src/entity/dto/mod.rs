pub mod board_state_dto;
