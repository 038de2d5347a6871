mod test_stale_participants_purged;
