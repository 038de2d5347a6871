mod test_empty_room_removed;
mod test_join_creates_room;
mod test_leave_removes_participant;
mod test_rejoin_is_noop;
