mod test_stop_sequence;
