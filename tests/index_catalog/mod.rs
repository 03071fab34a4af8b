mod snapshot_reads;
